use super::*;
use std::io::Write;

/// 导出表头（列顺序固定）
pub const EXPORT_HEADERS: [&str; 9] = [
    "day",
    "start_time",
    "end_time",
    "subject_id",
    "kind",
    "faculty_id",
    "batch_id",
    "classroom_id",
    "source",
];

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    day: &'static str,
    start_time: String,
    end_time: String,
    subject_id: &'a str,
    kind: &'static str,
    faculty_id: &'a str,
    batch_id: &'a str,
    classroom_id: &'a str,
    source: &'static str,
}

impl<'a> From<&'a TimetableEntry> for ExportRow<'a> {
    fn from(entry: &'a TimetableEntry) -> Self {
        Self {
            day: entry.day.to_db_str(),
            start_time: entry.start_time.format("%H:%M").to_string(),
            end_time: entry.end_time.format("%H:%M").to_string(),
            subject_id: &entry.subject_id,
            kind: entry.kind.to_db_str(),
            faculty_id: &entry.faculty_id,
            batch_id: &entry.batch_id,
            classroom_id: &entry.classroom_id,
            source: entry.source.to_db_str(),
        }
    }
}

impl TimetableApi {
    /// 导出周课表为 CSV（不含按日期生效的代课明细）
    ///
    /// # 返回
    /// 写出的数据行数
    pub fn export_csv<W: Write>(&self, timetable_id: &str, writer: W) -> ApiResult<usize> {
        let _perf = PerfGuard::new("export_csv").with_subject(timetable_id);

        self.get_timetable(timetable_id)?;
        let entries: Vec<TimetableEntry> = self
            .entry_repo
            .find_by_timetable(timetable_id)?
            .into_iter()
            .filter(|e| e.is_weekly())
            .collect();

        let export_error = |e: csv::Error| ApiError::InternalError(format!("CSV 写出失败: {}", e));

        let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        csv_writer.write_record(EXPORT_HEADERS).map_err(export_error)?;
        for entry in &entries {
            csv_writer.serialize(ExportRow::from(entry)).map_err(export_error)?;
        }
        csv_writer
            .flush()
            .map_err(|e| ApiError::InternalError(format!("CSV 写出失败: {}", e)))?;

        info!(timetable_id = %timetable_id, rows = entries.len(), "课表已导出");
        Ok(entries.len())
    }
}

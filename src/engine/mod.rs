// ==========================================
// 教学排课系统 - 引擎层
// ==========================================
// 职责: 实现排课与代课规则,不拼 SQL
// 红线: Engine 不拼 SQL, 未排/拒绝必须输出 reason
// ==========================================

pub mod conflict;
pub mod generator;
pub mod notifier;
pub mod preference;
pub mod slot_tracker;
pub mod substitution;

// 重导出核心引擎
pub use conflict::{ConflictDetector, SlotClaim};
pub use generator::{
    GenerationInput, GenerationOptions, GenerationOutcome, GenerationStats, TimetableGenerator,
    UnassignedReason, UnassignedUnit,
};
pub use notifier::{ChannelNotifier, NoOpNotifier, Notification, Notifier, OptionalNotifier};
pub use preference::{PreferenceRanker, RankedCandidate};
pub use slot_tracker::SlotAssignmentTracker;
pub use substitution::{
    CascadeContext, CascadeError, OfferEvent, OfferTransition, PlannedOffer, SubstitutionCascade,
};

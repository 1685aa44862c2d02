pub mod approval;
pub mod attendance;
pub mod leave_application;
pub mod leave_quota;
pub mod leave_type;
pub mod role;
pub mod smart_card;
pub mod user;
pub mod work_group;

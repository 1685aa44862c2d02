use crate::api::attendance::{CardCheckIn, MarkAbsentReq, RecordsQuery};
use crate::api::cards::EnrollCard;
use crate::api::leave::{
    BalanceQuery, CreateLeave, DecideLeave, HistoryEntry, HistoryQuery, LeaveFilter,
    LeaveListResponse, LeaveSummary,
};
use crate::api::leave_type::CreateLeaveType;
use crate::api::users::{UserListResponse, UserQuery};
use crate::api::work_group::{AssignUser, CreateWorkGroup};
use crate::domain::sweep::{SweepEntry, SweepOutcome, SweepStats};
use crate::model::approval::ApprovalWorkflowEntry;
use crate::model::attendance::AttendanceRecord;
use crate::model::leave_application::LeaveApplication;
use crate::model::leave_quota::UserLeaveQuota;
use crate::model::leave_type::LeaveType;
use crate::model::smart_card::SmartCard;
use crate::model::user::User;
use crate::model::work_group::WorkGroup;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SmartID Attendance & Leave API",
        version = "1.0.0",
        description = r#"
## SmartID — institution attendance & leave management

This API powers attendance tracking and leave management for multi-tenant
institutions (schools, organizations). Every record is owned by an
institution; queries never cross tenant walls.

### 🔹 Key Features
- **Leave Management**
  - Apply for leave, approve/reject with quota debit, history and balances
- **Leave Quotas**
  - Per-user, per-type, per-year allocations created lazily from defaults
- **Attendance Management**
  - Self check-in/out, card (RFID/NFC) gate check-in, late/early detection
- **Absence Sweep**
  - End-of-day batch marking missing attendance as absent, with dry-run
- **Work Groups**
  - Institution schedules driving the working-day policy

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication**. Decision and
admin operations require the **Admin** or **Institution Admin** role; card
check-in requires a **Device** account; the sweep accepts operator accounts.

### 📦 Response Format
- JSON responses shaped `{"success": bool, ...}`
- Failures are `{"success": false, "error": "..."}` with a 4xx/5xx status

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave::create_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::get_leave,
        crate::api::leave::leave_list,
        crate::api::leave::leave_history,
        crate::api::leave::leave_balance,
        crate::api::leave::leave_quota,

        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::update_leave_type,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::card_check_in,
        crate::api::attendance::mark_absent,
        crate::api::attendance::list_records,

        crate::api::cards::enroll_card,
        crate::api::cards::list_cards,
        crate::api::cards::deactivate_card,

        crate::api::work_group::list_work_groups,
        crate::api::work_group::create_work_group,
        crate::api::work_group::assign_user,

        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::deactivate_user
    ),
    components(
        schemas(
            CreateLeave,
            DecideLeave,
            LeaveFilter,
            LeaveSummary,
            LeaveListResponse,
            HistoryQuery,
            HistoryEntry,
            BalanceQuery,
            UserLeaveQuota,
            LeaveType,
            CreateLeaveType,
            CardCheckIn,
            MarkAbsentReq,
            RecordsQuery,
            AttendanceRecord,
            LeaveApplication,
            ApprovalWorkflowEntry,
            SmartCard,
            EnrollCard,
            SweepStats,
            SweepEntry,
            SweepOutcome,
            WorkGroup,
            CreateWorkGroup,
            AssignUser,
            User,
            UserQuery,
            UserListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave application and quota APIs"),
        (name = "LeaveType", description = "Leave type administration APIs"),
        (name = "Attendance", description = "Attendance and absence sweep APIs"),
        (name = "Card", description = "Smart card enrollment APIs"),
        (name = "WorkGroup", description = "Work group administration APIs"),
        (name = "User", description = "User administration APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

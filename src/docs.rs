use crate::api::leave_request::CreateLeave;
use crate::auth::handlers::LoginResponse;
use crate::engine::attendance::{AttendanceResult, ClockInRequest, ClockOutRequest};
use crate::engine::report::{AttendanceReportRow, ReportQuery, ReportStatus};
use crate::model::attendance::{AttendanceRecord, GeoPoint};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::system_config::{SystemConfig, SystemConfigUpdate};
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Field Staff Attendance API",
        version = "1.0.0",
        description = r#"
## Field Staff Attendance

Clock-in and clock-out for staff working at supervised field locations,
with geofencing for managers, administrative overrides and a reconciled
per-day attendance report.

### Key Features
- **Attendance**
  - Idempotent clock-in / clock-out per staff member and day
  - Supervisor and location assignment checks, GM override
- **Reporting**
  - One row per assigned staff member per day: present, late, absent, on-leave or holiday
- **Leave**
  - Submit, approve and reject leave requests
- **System Config**
  - Grace period and minimum clock interval

### Security
Endpoints under the API prefix require a **JWT Bearer** token from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::report,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::system_config::get_config,
        crate::api::system_config::update_config
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            GeoPoint,
            ClockInRequest,
            ClockOutRequest,
            AttendanceRecord,
            AttendanceResult,
            ReportQuery,
            ReportStatus,
            AttendanceReportRow,
            CreateLeave,
            LeaveRequest,
            LeaveStatus,
            LeaveType,
            SystemConfig,
            SystemConfigUpdate
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login"),
        (name = "Attendance", description = "Clock-in, clock-out and reporting"),
        (name = "Leave", description = "Leave requests"),
        (name = "System Config", description = "Attendance settings"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

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

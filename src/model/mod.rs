pub mod assignment;
pub mod attendance;
pub mod leave_request;
pub mod location;
pub mod role;
pub mod staff;
pub mod system_config;

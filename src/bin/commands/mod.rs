pub mod build_cmd;
pub mod config_cmd;
pub mod export_cmd;
pub mod info_cmd;
pub mod lookup_cmd;

pub use build_cmd::cmd_build;
pub use config_cmd::cmd_config;
pub use export_cmd::cmd_export;
pub use info_cmd::cmd_info;
pub use lookup_cmd::cmd_lookup;

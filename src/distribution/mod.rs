//! Archive installer: version catalog, install and removal of distributions.

mod catalog;
mod install;
mod setup;

pub use catalog::{
    archive_url, build_choices, parse_version_listing, VersionCatalog, VersionChoice,
    LATEST_LABEL_PREFIX,
};
pub use install::{archive_file_name, instance_name_for, install_version, normalize_minor, remove_version};
pub use setup::{append_env_overrides, fix_permissions};

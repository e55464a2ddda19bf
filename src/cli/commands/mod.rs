mod add;
mod auth;
mod list;
mod reconcile;
mod remove;
mod watch;

pub use add::{cmd_add, search_result_from_args};
pub use auth::{cmd_login, cmd_logout, cmd_register, cmd_whoami};
pub use list::{cmd_collected, cmd_list, cmd_media};
pub use reconcile::cmd_reconcile;
pub use remove::{cmd_remove, cmd_remove_entry};
pub use watch::cmd_watch;

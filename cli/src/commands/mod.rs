mod feed;
mod helpers;
mod import;
mod meal;
mod profile;

pub(crate) use feed::{cmd_feed, cmd_show};
pub(crate) use import::{cmd_export, cmd_import};
pub(crate) use meal::{MealFields, cmd_delete, cmd_edit, cmd_like, cmd_save, cmd_submit};
pub(crate) use profile::cmd_mine;

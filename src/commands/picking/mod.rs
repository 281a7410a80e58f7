pub mod confirm_pick_command;

pub use confirm_pick_command::ConfirmPickCommand;

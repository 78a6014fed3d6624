pub mod diagnostics;
pub mod error;
pub mod health;
pub mod language;
pub mod messages;
pub mod room;
pub mod rooms;

pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use language::*;
pub use messages::*;
pub use room::*;
pub use rooms::*;

pub mod attach;
pub mod cdp;
pub mod core;
pub mod errors;
pub mod flow;
pub mod locate;
pub mod probe;
pub mod totp;

pub use cdp::{CdpClient, CdpPage};
pub use core::{Config, PageDriver};
pub use errors::AutofillError;
pub use flow::{run_login, LoginFlow};
pub use locate::Criterion;
pub use totp::{CodeGenerator, OathtoolGenerator};

pub mod traits;
pub mod notifiers;

pub use notifiers::TelegramNotifier;
pub use traits::{NotificationResult, NotifierPlugin};

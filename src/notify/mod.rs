//! Everything the watchdog tells the outside world: screens, speech and
//! lifecycle events.

mod bus;
pub mod dialog;
mod directive;

pub use bus::{parse_inbound, BusEvent, InboundMessage, JsonLinesNotifier};
pub use dialog::{DialogCatalog, Utterance};
pub use directive::{DisplayDirective, PageKind, PageStyle, SetupPage};

/// Receiver of display directives, spoken prompts and bus events.
///
/// Calls are fire-and-forget; implementations log their own failures.
pub trait Notifier: Send + Sync {
    fn show(&self, directive: &DisplayDirective);

    fn speak(&self, utterance: &Utterance);

    fn release_display(&self);

    fn emit(&self, event: BusEvent);
}

pub mod gateway;
pub mod ledger;
pub mod notifications;
pub mod reconciler;

mod calendar;
mod common;
mod ledger;

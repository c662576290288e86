mod fetch;
mod run;
mod urls;

#[cfg(test)]
pub use fetch::FetchResponse;
pub use fetch::{HttpSource, PdfSource};
pub use run::{download_months, run};

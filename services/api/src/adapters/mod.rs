pub mod intercom;
pub mod report_client;

pub use intercom::IntercomSource;
pub use report_client::ReportClient;

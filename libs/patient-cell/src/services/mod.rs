pub mod consent;
pub mod history;
pub mod patient;

pub use consent::ConsentService;
pub use history::HistoryService;
pub use patient::PatientService;

mod alert;
mod analysis;
mod reading;

pub use alert::AlertRepository;
pub use analysis::AnalysisRepository;
pub use reading::ReadingRepository;

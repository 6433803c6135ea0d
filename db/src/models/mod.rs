pub mod ai_grading;
pub mod assignment;
pub mod final_grading;
pub mod portfolio;
pub mod rubric;

pub use ai_grading::Entity as AiGrading;
pub use assignment::Entity as Assignment;
pub use final_grading::Entity as FinalGrading;
pub use portfolio::Entity as Portfolio;
pub use rubric::Entity as Rubric;

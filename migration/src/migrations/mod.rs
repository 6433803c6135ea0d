pub mod m202601150001_create_assignments;
pub mod m202601150002_create_portfolios;
pub mod m202601150003_create_rubrics;
pub mod m202601150004_create_ai_gradings;
pub mod m202601150005_create_final_gradings;

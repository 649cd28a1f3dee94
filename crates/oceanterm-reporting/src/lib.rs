pub mod export;

pub use export::{
    report_json, task1_json, task2_json, write_report, write_task1, write_task2,
};

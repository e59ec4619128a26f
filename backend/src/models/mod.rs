pub mod task;

pub use task::{NewTaskRequest, Priority, Task, TaskStatus, UpdateTaskRequest};

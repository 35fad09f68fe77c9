pub mod board;
pub mod task;
pub mod user;

pub use board::Entity as Board;
pub use task::Entity as Task;
pub use user::Entity as User;

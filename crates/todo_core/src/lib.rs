pub mod domain;
pub mod http;
pub mod ports;
pub mod session_store;
pub mod storage;
pub mod todo_store;

pub use domain::{Credentials, NewTodoItem, Session, TodoItem, TodoStatus, TokenPair, UserInformation};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use ports::{DurableStorage, FieldErrors, HttpTransport, PortError, PortResult};
pub use session_store::{SessionState, SessionStore};
pub use storage::{MemoryStorage, TokenVault};
pub use todo_store::TodoStore;

pub mod delete_requests;

pub use delete_requests::DeleteRequests;

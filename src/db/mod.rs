pub mod addb;
pub mod chatdb;
pub mod db;
pub mod jobrequestdb;
pub mod notificationdb;
pub mod offerdb;
pub mod paymentdb;

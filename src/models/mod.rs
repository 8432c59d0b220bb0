pub mod admodel;
pub mod chatmodel;
pub mod jobrequestmodel;
pub mod notificationmodel;
pub mod offermodel;
pub mod paymentmodel;

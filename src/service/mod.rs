pub mod advert_service;
pub mod background_jobs;
pub mod chat_service;
pub mod error;
pub mod escrow_service;
pub mod negotiation_service;
pub mod notification_service;
pub mod payment_gateway;
pub mod realtime_service;
pub mod refund_policy;
pub mod settlement_service;
pub mod webhook_service;

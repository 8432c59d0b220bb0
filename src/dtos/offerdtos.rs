use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{models::offermodel::NegotiationTermsUpdate, utils::currency::to_minor_units};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

// Negotiation DTOs
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateNegotiationDto {
    #[validate(range(min = 0.01, message = "Price must be positive"))]
    pub price: Option<f64>,

    pub date: Option<NaiveDate>,

    #[validate(custom = "validate_time_format")]
    pub time: Option<String>,

    #[validate(length(min = 1, max = 1000, message = "Materials must be between 1 and 1000 characters"))]
    pub materials: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Scope must be between 1 and 2000 characters"))]
    pub scope: Option<String>,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

impl From<UpdateNegotiationDto> for NegotiationTermsUpdate {
    fn from(dto: UpdateNegotiationDto) -> Self {
        NegotiationTermsUpdate {
            price_minor: dto.price.map(to_minor_units),
            service_date: dto.date,
            service_time: dto.time,
            materials: dto.materials,
            scope: dto.scope,
            note: dto.note,
        }
    }
}

fn validate_time_format(time: &str) -> Result<(), ValidationError> {
    chrono::NaiveTime::parse_from_str(time, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::new("time must be in HH:MM format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_format_is_validated() {
        assert!(validate_time_format("09:30").is_ok());
        assert!(validate_time_format("23:59").is_ok());
        assert!(validate_time_format("9am").is_err());
        assert!(validate_time_format("25:00").is_err());
    }

    #[test]
    fn dto_converts_price_to_minor_units() {
        let dto = UpdateNegotiationDto {
            price: Some(1000.0),
            ..Default::default()
        };
        let update: NegotiationTermsUpdate = dto.into();
        assert_eq!(update.price_minor, Some(100_000));
    }
}

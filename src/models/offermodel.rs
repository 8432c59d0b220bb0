use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "offer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Negotiating,
    AgreementReached,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
    Withdrawn,
}

impl OfferStatus {
    pub fn to_str(&self) -> &str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Negotiating => "negotiating",
            OfferStatus::AgreementReached => "agreement_reached",
            OfferStatus::Accepted => "accepted",
            OfferStatus::InProgress => "in_progress",
            OfferStatus::Completed => "completed",
            OfferStatus::Cancelled => "cancelled",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OfferStatus::Completed
                | OfferStatus::Cancelled
                | OfferStatus::Rejected
                | OfferStatus::Withdrawn
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "offer_payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferPaymentStatus {
    Pending,
    Escrowed,
    Released,
    Refunded,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "cancellation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    Requested,
    Processed,
}

/// One negotiation-history entry value, typed per field. Stored as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum NegotiationChange {
    Price {
        old: Option<i64>,
        new: Option<i64>,
    },
    Date {
        old: Option<NaiveDate>,
        new: Option<NaiveDate>,
    },
    Time {
        old: Option<String>,
        new: Option<String>,
    },
    Materials {
        old: Option<String>,
        new: Option<String>,
    },
    Scope {
        old: Option<String>,
        new: Option<String>,
    },
    Confirmation {
        seeker_was: bool,
        provider_was: bool,
        seeker_now: bool,
        provider_now: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiationHistoryEntry {
    #[serde(flatten)]
    pub change: NegotiationChange,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The set of term edits a party may submit in one call. All fields optional;
/// only fields that actually differ from the stored value count as changes.
#[derive(Debug, Clone, Default)]
pub struct NegotiationTermsUpdate {
    pub price_minor: Option<i64>,
    pub service_date: Option<NaiveDate>,
    pub service_time: Option<String>,
    pub materials: Option<String>,
    pub scope: Option<String>,
    pub note: Option<String>,
}

/// A provider's bid on a JobRequest, carrying the negotiable terms, the
/// per-party confirmation flags, and the payment/cancellation sub-state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub job_request_id: Uuid,
    pub provider_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub currency: String,
    pub status: Option<OfferStatus>, // Database has DEFAULT 'pending', can be NULL

    // Negotiable terms
    pub price_minor: Option<i64>,
    pub service_date: Option<NaiveDate>,
    pub service_time: Option<String>,
    pub materials: Option<String>,
    pub scope: Option<String>,
    pub seeker_confirmed: Option<bool>,   // Database has DEFAULT FALSE
    pub provider_confirmed: Option<bool>, // Database has DEFAULT FALSE
    pub negotiation_history: Json<Vec<NegotiationHistoryEntry>>,
    pub last_modified_by: Option<Uuid>,
    pub last_modified_at: Option<DateTime<Utc>>,

    // Payment sub-state
    pub payment_status: Option<OfferPaymentStatus>,
    pub payment_id: Option<Uuid>,
    pub escrowed_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,

    // Cancellation sub-state
    pub cancellation_status: Option<CancellationStatus>,
    pub cancellation_requested_by: Option<Uuid>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund_amount_minor: Option<i64>,
    pub refund_percentage: Option<f64>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn current_status(&self) -> OfferStatus {
        self.status.unwrap_or(OfferStatus::Pending)
    }

    /// Terms may only be edited before the offer is accepted.
    pub fn can_edit_terms(&self) -> bool {
        matches!(
            self.current_status(),
            OfferStatus::Pending | OfferStatus::Negotiating | OfferStatus::AgreementReached
        )
    }

    pub fn seeker_confirmed(&self) -> bool {
        self.seeker_confirmed.unwrap_or(false)
    }

    pub fn provider_confirmed(&self) -> bool {
        self.provider_confirmed.unwrap_or(false)
    }

    pub fn both_confirmed(&self) -> bool {
        self.seeker_confirmed() && self.provider_confirmed()
    }

    /// The first negotiation term still unset, if any. All five must be set
    /// before either party can confirm.
    pub fn missing_negotiation_field(&self) -> Option<&'static str> {
        if self.price_minor.is_none() {
            Some("price")
        } else if self.service_date.is_none() {
            Some("date")
        } else if self.service_time.is_none() {
            Some("time")
        } else if self.materials.is_none() {
            Some("materials")
        } else if self.scope.is_none() {
            Some("scope")
        } else {
            None
        }
    }

    pub fn negotiation_complete(&self) -> bool {
        self.missing_negotiation_field().is_none()
    }

    /// Agreed service date+time as a UTC instant, for the refund policy.
    /// A date with a missing or unparsable time falls back to midnight.
    pub fn scheduled_datetime(&self) -> Option<DateTime<Utc>> {
        let date = self.service_date?;
        let time = self
            .service_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
            .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        Some(date.and_time(time).and_utc())
    }

    /// Apply a term-update request: for each field that actually differs,
    /// write the new value and append a typed history entry. If both
    /// confirmation flags were set before the edit, both are cleared and a
    /// synthetic confirmation entry records the reset — any accepted edit
    /// forces re-confirmation by both parties.
    ///
    /// Returns the number of changed term fields (0 means no-op).
    pub fn apply_term_updates(
        &mut self,
        changed_by: Uuid,
        update: &NegotiationTermsUpdate,
        now: DateTime<Utc>,
    ) -> usize {
        let was_fully_confirmed = self.both_confirmed();
        let mut changed = 0usize;

        let mut entries: Vec<NegotiationHistoryEntry> = Vec::new();
        let mut push = |change: NegotiationChange| {
            entries.push(NegotiationHistoryEntry {
                change,
                changed_by,
                changed_at: now,
                note: update.note.clone(),
            });
        };

        if let Some(price) = update.price_minor {
            if self.price_minor != Some(price) {
                push(NegotiationChange::Price {
                    old: self.price_minor,
                    new: Some(price),
                });
                self.price_minor = Some(price);
                changed += 1;
            }
        }
        if let Some(date) = update.service_date {
            if self.service_date != Some(date) {
                push(NegotiationChange::Date {
                    old: self.service_date,
                    new: Some(date),
                });
                self.service_date = Some(date);
                changed += 1;
            }
        }
        if let Some(ref time) = update.service_time {
            if self.service_time.as_deref() != Some(time.as_str()) {
                push(NegotiationChange::Time {
                    old: self.service_time.clone(),
                    new: Some(time.clone()),
                });
                self.service_time = Some(time.clone());
                changed += 1;
            }
        }
        if let Some(ref materials) = update.materials {
            if self.materials.as_deref() != Some(materials.as_str()) {
                push(NegotiationChange::Materials {
                    old: self.materials.clone(),
                    new: Some(materials.clone()),
                });
                self.materials = Some(materials.clone());
                changed += 1;
            }
        }
        if let Some(ref scope) = update.scope {
            if self.scope.as_deref() != Some(scope.as_str()) {
                push(NegotiationChange::Scope {
                    old: self.scope.clone(),
                    new: Some(scope.clone()),
                });
                self.scope = Some(scope.clone());
                changed += 1;
            }
        }

        if changed == 0 {
            return 0;
        }

        if was_fully_confirmed {
            self.seeker_confirmed = Some(false);
            self.provider_confirmed = Some(false);
            entries.push(NegotiationHistoryEntry {
                change: NegotiationChange::Confirmation {
                    seeker_was: true,
                    provider_was: true,
                    seeker_now: false,
                    provider_now: false,
                },
                changed_by,
                changed_at: now,
                note: Some("confirmations reset by term change".to_string()),
            });
        }

        self.negotiation_history.0.extend(entries);
        self.last_modified_by = Some(changed_by);
        self.last_modified_at = Some(now);
        changed
    }

    /// Record one party's confirmation of the current terms, with a history
    /// entry capturing the flag transition.
    pub fn record_confirmation(&mut self, user_id: Uuid, is_seeker: bool, now: DateTime<Utc>) {
        let seeker_was = self.seeker_confirmed();
        let provider_was = self.provider_confirmed();
        if is_seeker {
            self.seeker_confirmed = Some(true);
        } else {
            self.provider_confirmed = Some(true);
        }
        self.negotiation_history.0.push(NegotiationHistoryEntry {
            change: NegotiationChange::Confirmation {
                seeker_was,
                provider_was,
                seeker_now: self.seeker_confirmed(),
                provider_now: self.provider_confirmed(),
            },
            changed_by: user_id,
            changed_at: now,
            note: None,
        });
        self.last_modified_by = Some(user_id);
        self.last_modified_at = Some(now);
    }

    /// Clear both confirmation flags, auditing the prior values.
    pub fn clear_confirmations(&mut self, user_id: Uuid, now: DateTime<Utc>, note: &str) {
        let seeker_was = self.seeker_confirmed();
        let provider_was = self.provider_confirmed();
        self.seeker_confirmed = Some(false);
        self.provider_confirmed = Some(false);
        self.negotiation_history.0.push(NegotiationHistoryEntry {
            change: NegotiationChange::Confirmation {
                seeker_was,
                provider_was,
                seeker_now: false,
                provider_now: false,
            },
            changed_by: user_id,
            changed_at: now,
            note: Some(note.to_string()),
        });
        self.last_modified_by = Some(user_id);
        self.last_modified_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_offer() -> Offer {
        Offer {
            id: Uuid::new_v4(),
            job_request_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            conversation_id: None,
            currency: "usd".to_string(),
            status: Some(OfferStatus::Negotiating),
            price_minor: Some(100_000),
            service_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            service_time: Some("14:30".to_string()),
            materials: Some("provider supplies paint".to_string()),
            scope: Some("paint two bedrooms".to_string()),
            seeker_confirmed: Some(false),
            provider_confirmed: Some(false),
            negotiation_history: Json(Vec::new()),
            last_modified_by: None,
            last_modified_at: None,
            payment_status: None,
            payment_id: None,
            escrowed_at: None,
            released_at: None,
            cancellation_status: None,
            cancellation_requested_by: None,
            cancellation_requested_at: None,
            cancellation_reason: None,
            refund_amount_minor: None,
            refund_percentage: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn identical_terms_count_as_no_change() {
        let mut offer = test_offer();
        let update = NegotiationTermsUpdate {
            price_minor: Some(100_000),
            service_time: Some("14:30".to_string()),
            ..Default::default()
        };
        let changed = offer.apply_term_updates(offer.provider_id, &update, Utc::now());
        assert_eq!(changed, 0);
        assert!(offer.negotiation_history.0.is_empty());
    }

    #[test]
    fn changed_fields_each_get_a_history_entry() {
        let mut offer = test_offer();
        let by = offer.provider_id;
        let update = NegotiationTermsUpdate {
            price_minor: Some(120_000),
            scope: Some("paint three bedrooms".to_string()),
            note: Some("added the study".to_string()),
            ..Default::default()
        };
        let changed = offer.apply_term_updates(by, &update, Utc::now());
        assert_eq!(changed, 2);
        assert_eq!(offer.price_minor, Some(120_000));
        assert_eq!(offer.scope.as_deref(), Some("paint three bedrooms"));
        assert_eq!(offer.negotiation_history.0.len(), 2);
        assert!(matches!(
            offer.negotiation_history.0[0].change,
            NegotiationChange::Price {
                old: Some(100_000),
                new: Some(120_000)
            }
        ));
        assert_eq!(offer.last_modified_by, Some(by));
    }

    #[test]
    fn edit_while_fully_confirmed_resets_both_flags() {
        let mut offer = test_offer();
        offer.seeker_confirmed = Some(true);
        offer.provider_confirmed = Some(true);

        let update = NegotiationTermsUpdate {
            price_minor: Some(90_000),
            ..Default::default()
        };
        let changed = offer.apply_term_updates(offer.provider_id, &update, Utc::now());

        assert_eq!(changed, 1);
        assert!(!offer.seeker_confirmed());
        assert!(!offer.provider_confirmed());
        // price entry + synthetic confirmation-reset entry
        assert_eq!(offer.negotiation_history.0.len(), 2);
        let last = offer.negotiation_history.0.last().unwrap();
        assert!(matches!(
            last.change,
            NegotiationChange::Confirmation {
                seeker_was: true,
                provider_was: true,
                seeker_now: false,
                provider_now: false,
            }
        ));
    }

    #[test]
    fn edit_with_one_confirmation_keeps_the_flag() {
        let mut offer = test_offer();
        offer.provider_confirmed = Some(true);

        let update = NegotiationTermsUpdate {
            materials: Some("seeker supplies paint".to_string()),
            ..Default::default()
        };
        offer.apply_term_updates(offer.provider_id, &update, Utc::now());

        // Only a both-confirmed state triggers the reset.
        assert!(offer.provider_confirmed());
        assert_eq!(offer.negotiation_history.0.len(), 1);
    }

    #[test]
    fn missing_field_reported_in_order() {
        let mut offer = test_offer();
        assert_eq!(offer.missing_negotiation_field(), None);
        offer.materials = None;
        assert_eq!(offer.missing_negotiation_field(), Some("materials"));
        offer.price_minor = None;
        assert_eq!(offer.missing_negotiation_field(), Some("price"));
    }

    #[test]
    fn confirmation_history_captures_flag_transition() {
        let mut offer = test_offer();
        let seeker = Uuid::new_v4();
        offer.record_confirmation(seeker, true, Utc::now());
        assert!(offer.seeker_confirmed());
        assert!(!offer.both_confirmed());
        assert!(matches!(
            offer.negotiation_history.0[0].change,
            NegotiationChange::Confirmation {
                seeker_was: false,
                seeker_now: true,
                ..
            }
        ));

        offer.record_confirmation(offer.provider_id, false, Utc::now());
        assert!(offer.both_confirmed());
    }

    #[test]
    fn scheduled_datetime_combines_date_and_time() {
        let offer = test_offer();
        let dt = offer.scheduled_datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-01T14:30:00+00:00");
    }

    #[test]
    fn scheduled_datetime_defaults_to_midnight_without_time() {
        let mut offer = test_offer();
        offer.service_time = None;
        let dt = offer.scheduled_datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-01T00:00:00+00:00");

        offer.service_date = None;
        assert!(offer.scheduled_datetime().is_none());
    }

    #[test]
    fn history_entries_round_trip_through_json() {
        let entry = NegotiationHistoryEntry {
            change: NegotiationChange::Price {
                old: None,
                new: Some(50_000),
            },
            changed_by: Uuid::new_v4(),
            changed_at: Utc::now(),
            note: None,
        };
        let raw = serde_json::to_value(&entry).unwrap();
        assert_eq!(raw["field"], "price");
        let back: NegotiationHistoryEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(back, entry);
    }
}

//! Ledger Write Path Tests
//!
//! Gas estimation with fallback and buffering, and the classification of
//! failed submissions into reverted versus indeterminate.

#[cfg(test)]
mod tests {
    use crate::support::{identity, patient_profile, MockLedger, MOCK_GAS_ESTIMATE};
    use anyhow::Result;
    use dmed_core::{
        DmedError, LedgerGateway, RecordMetadata, RevertCause, FALLBACK_GAS_LIMIT,
    };

    #[tokio::test]
    async fn submitted_gas_limit_is_the_buffered_estimate() -> Result<()> {
        let ledger = MockLedger::new();
        let gateway = LedgerGateway::new(ledger);
        let patient = identity(1);

        gateway
            .register_patient(patient, patient_profile("Ada"))
            .await?;

        let limits = gateway.ledger().submitted_gas_limits();
        assert_eq!(limits, vec![MOCK_GAS_ESTIMATE * 13 / 10]); // 130_000
        Ok(())
    }

    #[tokio::test]
    async fn failed_estimation_uses_the_buffered_fallback_limit() -> Result<()> {
        let ledger = MockLedger::new();
        ledger.fail_estimation();
        let gateway = LedgerGateway::new(ledger);

        gateway
            .register_patient(identity(1), patient_profile("Ada"))
            .await?;

        let limits = gateway.ledger().submitted_gas_limits();
        assert_eq!(limits, vec![FALLBACK_GAS_LIMIT * 13 / 10]); // 650_000
        Ok(())
    }

    #[tokio::test]
    async fn included_but_reverted_receipt_reports_all_three_causes() {
        let ledger = MockLedger::new();
        ledger.revert_next_submission();
        let gateway = LedgerGateway::new(ledger);

        let err = gateway
            .grant_access(identity(1), identity(2))
            .await
            .unwrap_err();
        match err {
            DmedError::TransactionReverted(report) => {
                assert_eq!(report.causes, RevertCause::ALL.to_vec());
            }
            other => panic!("expected revert classification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn contract_revert_message_is_classified_as_reverted() {
        // No grant exists, so the contract itself rejects the record write
        let gateway = LedgerGateway::new(MockLedger::new());
        let metadata = RecordMetadata {
            doctor_name: "Dr. Zhang".into(),
            reason: "checkup".into(),
            date: "2024-01-01".into(),
        };

        let err = gateway
            .add_medical_record(identity(2), identity(1), &metadata, "abc123".into())
            .await
            .unwrap_err();
        match err {
            DmedError::TransactionReverted(report) => {
                assert!(report.message.contains("access not granted"));
                assert_eq!(report.causes.len(), 3);
            }
            other => panic!("expected revert classification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_revert_rejection_is_indeterminate_submission_failure() {
        let ledger = MockLedger::new();
        ledger.reject_next_submission("nonce too low");
        let gateway = LedgerGateway::new(ledger);

        let err = gateway
            .grant_access(identity(1), identity(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DmedError::TransactionSubmission(msg) if msg == "nonce too low"
        ));
    }

    #[tokio::test]
    async fn reverted_write_leaves_state_unchanged() -> Result<()> {
        let ledger = MockLedger::new();
        ledger.revert_next_submission();
        let gateway = LedgerGateway::new(ledger);
        let (patient, doctor) = (identity(1), identity(2));

        let _ = gateway.grant_access(patient, doctor).await;
        assert!(!gateway.has_access(patient, doctor).await?);
        Ok(())
    }
}

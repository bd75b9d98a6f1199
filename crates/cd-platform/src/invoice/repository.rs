//! Invoice Repository

use super::entity::{Invoice, InvoiceStatus};
use crate::audit::Actor;
use crate::collection::CollectionRepository;
use crate::shared::error::Result;

pub type InvoiceRepository = CollectionRepository<Invoice>;

impl CollectionRepository<Invoice> {
    /// Soft-cancel an invoice. Paid invoices cannot be voided.
    pub async fn void(&self, id: &str, actor: &Actor) -> Result<Invoice> {
        self.modify(
            id,
            |invoice| {
                invoice.status = InvoiceStatus::Void;
                Ok(())
            },
            actor,
            "Voided",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditService;
    use crate::shared::error::PlatformError;
    use serde_json::{json, Map, Value};
    use crate::invoice::entity::{Currency, LineItem};
    use crate::storage::Storage;

    fn repo() -> InvoiceRepository {
        let storage = Storage::in_memory();
        InvoiceRepository::new(storage.clone(), AuditService::new(storage, 100))
    }

    #[tokio::test]
    async fn test_create_numbers_and_totals() {
        let repo = repo();
        let mut invoice = Invoice::draft("P1", Currency::Usd);
        invoice.line_items = vec![LineItem::new("Certifications", 2.0, 50.0)];

        let created = repo.create(invoice, &Actor::system()).await.unwrap();
        assert_eq!(created.invoice_number, "INV-00001");
        assert_eq!(created.total_amount, 100.0);
        assert_eq!(repo.get_by_id(&created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_void() {
        let repo = repo();
        let created = repo.create(Invoice::draft("P1", Currency::Usd), &Actor::system()).await.unwrap();
        let voided = repo.void(&created.id, &Actor::system()).await.unwrap();
        assert_eq!(voided.status, InvoiceStatus::Void);

        let mut paid = Invoice::draft("P1", Currency::Usd);
        paid.status = InvoiceStatus::Paid;
        let paid = repo.create(paid, &Actor::system()).await.unwrap();
        assert!(matches!(
            repo.void(&paid.id, &Actor::system()).await,
            Err(PlatformError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_number_not_reused_after_delete() {
        let repo = repo();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(repo.create(Invoice::draft("P1", Currency::Usd), &Actor::system()).await.unwrap().id);
        }
        repo.delete(&ids[1], &Actor::system()).await.unwrap();
        let next = repo.create(Invoice::draft("P1", Currency::Usd), &Actor::system()).await.unwrap();
        assert_eq!(next.invoice_number, "INV-00004");

        let mut numbers: Vec<String> = repo
            .get_all(None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.invoice_number)
            .collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 3);
    }

    #[tokio::test]
    async fn test_update_recalculates_totals() {
        let repo = repo();
        let mut invoice = Invoice::draft("P1", Currency::Usd);
        invoice.line_items = vec![LineItem::new("Certifications", 1.0, 100.0)];
        let created = repo.create(invoice, &Actor::system()).await.unwrap();

        let fields: Map<String, Value> = serde_json::from_value(json!({
            "lineItems": [{"description": "Certifications", "quantity": 5, "unitPrice": 100}],
            "taxRate": 10
        }))
        .unwrap();
        let updated = repo.update(&created.id, &fields, &Actor::system()).await.unwrap();
        assert_eq!(updated.line_items[0].total, 500.0);
        assert_eq!(updated.subtotal, 500.0);
        assert_eq!(updated.total_amount, 550.0);
        assert_eq!(repo.get_by_id(&created.id).await.unwrap(), Some(updated));
    }
}

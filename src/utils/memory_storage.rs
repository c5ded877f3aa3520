//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::InstallmentStore;
use crate::types::*;

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    installments: Arc<RwLock<HashMap<Uuid, Installment>>>,
    accounts: Arc<RwLock<HashMap<Uuid, BankAccount>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.installments.write().unwrap().clear();
        self.accounts.write().unwrap().clear();
    }
}

#[async_trait]
impl InstallmentStore for MemoryStorage {
    async fn save_installment(&mut self, installment: &Installment) -> BillingResult<()> {
        self.installments
            .write()
            .unwrap()
            .insert(installment.id, installment.clone());
        Ok(())
    }

    async fn get_installment(&self, id: &Uuid) -> BillingResult<Option<Installment>> {
        Ok(self.installments.read().unwrap().get(id).cloned())
    }

    async fn find_by_nosso_numero(
        &self,
        nosso_numero: &str,
    ) -> BillingResult<Option<Installment>> {
        Ok(self
            .installments
            .read()
            .unwrap()
            .values()
            .find(|installment| installment.nosso_numero == nosso_numero)
            .cloned())
    }

    async fn list_open_installments(
        &self,
        contract_code: Option<&str>,
    ) -> BillingResult<Vec<Installment>> {
        let installments = self.installments.read().unwrap();
        let mut open: Vec<Installment> = installments
            .values()
            .filter(|installment| !installment.paid)
            .filter(|installment| {
                contract_code.is_none_or(|code| installment.contract_code == code)
            })
            .cloned()
            .collect();
        open.sort_by(|a, b| a.nosso_numero.cmp(&b.nosso_numero));
        Ok(open)
    }

    async fn update_installment(&mut self, installment: &Installment) -> BillingResult<()> {
        if self
            .installments
            .read()
            .unwrap()
            .contains_key(&installment.id)
        {
            self.installments
                .write()
                .unwrap()
                .insert(installment.id, installment.clone());
            Ok(())
        } else {
            Err(BillingError::TitleNotFound(installment.nosso_numero.clone()))
        }
    }

    async fn apply_settlements(&mut self, updates: &[Installment]) -> BillingResult<()> {
        let mut installments = self.installments.write().unwrap();

        // validate the whole batch before touching anything
        for update in updates {
            if !installments.contains_key(&update.id) {
                return Err(BillingError::TitleNotFound(update.nosso_numero.clone()));
            }
        }
        for update in updates {
            installments.insert(update.id, update.clone());
        }
        Ok(())
    }

    async fn save_bank_account(&mut self, account: &BankAccount) -> BillingResult<()> {
        self.accounts
            .write()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn get_bank_account(&self, id: &Uuid) -> BillingResult<Option<BankAccount>> {
        Ok(self.accounts.read().unwrap().get(id).cloned())
    }
}

//! Funds collaborator: per-user wallets.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{Money, UserId, WalletId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, SagaError};

/// A user's cash balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub cash: Money,
}

/// Wallet reads, credits and debits.
///
/// Negative amounts are rejected. Debits do not check the balance; callers
/// validate sufficiency before debiting.
#[async_trait]
pub trait FundsService: Send + Sync {
    async fn get_wallet_by_user(&self, user_id: UserId) -> Result<Wallet>;

    async fn credit(&self, wallet_id: WalletId, amount: Money) -> Result<Wallet>;

    async fn debit(&self, wallet_id: WalletId, amount: Money) -> Result<Wallet>;
}

#[derive(Debug, Default)]
struct InMemoryFundsState {
    wallets: HashMap<WalletId, Wallet>,
    by_user: HashMap<UserId, WalletId>,
}

/// In-memory funds service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFundsService {
    state: Arc<RwLock<InMemoryFundsState>>,
    fail_on_credit: Arc<AtomicBool>,
    fail_on_debit: Arc<AtomicBool>,
}

impl InMemoryFundsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a wallet for a user with a starting balance.
    pub async fn open_wallet(&self, user_id: UserId, cash: Money) -> Wallet {
        let wallet = Wallet {
            id: WalletId::new(),
            user_id,
            cash,
        };
        let mut state = self.state.write().await;
        state.by_user.insert(user_id, wallet.id);
        state.wallets.insert(wallet.id, wallet.clone());
        wallet
    }

    pub fn set_fail_on_credit(&self, fail: bool) {
        self.fail_on_credit.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_on_debit(&self, fail: bool) {
        self.fail_on_debit.store(fail, Ordering::SeqCst);
    }

    /// Current balance of a user's wallet, if it exists.
    pub async fn balance(&self, user_id: UserId) -> Option<Money> {
        let state = self.state.read().await;
        state
            .by_user
            .get(&user_id)
            .and_then(|id| state.wallets.get(id))
            .map(|w| w.cash)
    }

    async fn adjust(
        &self,
        wallet_id: WalletId,
        amount: Money,
        apply: fn(&Money, Money) -> Option<Money>,
    ) -> Result<Wallet> {
        let mut state = self.state.write().await;
        let wallet = state
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| SagaError::not_found("wallet", wallet_id))?;
        wallet.cash = apply(&wallet.cash, amount).ok_or(SagaError::InvalidAmount(amount))?;
        Ok(wallet.clone())
    }
}

fn ensure_non_negative(amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(SagaError::InvalidAmount(amount));
    }
    Ok(())
}

#[async_trait]
impl FundsService for InMemoryFundsService {
    async fn get_wallet_by_user(&self, user_id: UserId) -> Result<Wallet> {
        let state = self.state.read().await;
        state
            .by_user
            .get(&user_id)
            .and_then(|id| state.wallets.get(id))
            .cloned()
            .ok_or_else(|| SagaError::not_found("wallet", user_id))
    }

    async fn credit(&self, wallet_id: WalletId, amount: Money) -> Result<Wallet> {
        ensure_non_negative(amount)?;
        if self.fail_on_credit.load(Ordering::SeqCst) {
            return Err(SagaError::Upstream("funds service unavailable".to_string()));
        }
        self.adjust(wallet_id, amount, Money::checked_add).await
    }

    async fn debit(&self, wallet_id: WalletId, amount: Money) -> Result<Wallet> {
        ensure_non_negative(amount)?;
        if self.fail_on_debit.load(Ordering::SeqCst) {
            return Err(SagaError::Upstream("funds service unavailable".to_string()));
        }
        self.adjust(wallet_id, amount, Money::checked_sub).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_credit_and_debit() {
        let service = InMemoryFundsService::new();
        let user = UserId::new();
        let wallet = service.open_wallet(user, Money::from_dollars(50)).await;

        service.debit(wallet.id, Money::from_dollars(32)).await.unwrap();
        let wallet = service.credit(wallet.id, Money::from_cents(50)).await.unwrap();

        assert_eq!(wallet.cash, Money::from_cents(1850));
        assert_eq!(service.get_wallet_by_user(user).await.unwrap(), wallet);
    }

    #[tokio::test]
    async fn test_negative_amounts_are_rejected() {
        let service = InMemoryFundsService::new();
        let wallet = service.open_wallet(UserId::new(), Money::from_dollars(5)).await;
        let negative = Money::from_cents(-1);

        assert!(matches!(
            service.credit(wallet.id, negative).await,
            Err(SagaError::InvalidAmount(_))
        ));
        assert!(matches!(
            service.debit(wallet.id, negative).await,
            Err(SagaError::InvalidAmount(_))
        ));
        assert_eq!(
            service.balance(wallet.user_id).await,
            Some(Money::from_dollars(5))
        );
    }

    #[tokio::test]
    async fn test_credit_overflow_leaves_balance_unchanged() {
        let service = InMemoryFundsService::new();
        let rich = Money::from_cents(i64::MAX - 1);
        let wallet = service.open_wallet(UserId::new(), rich).await;

        assert!(matches!(
            service.credit(wallet.id, Money::from_cents(2)).await,
            Err(SagaError::InvalidAmount(_))
        ));
        assert_eq!(service.balance(wallet.user_id).await, Some(rich));
    }

    #[tokio::test]
    async fn test_missing_wallet() {
        let service = InMemoryFundsService::new();
        assert!(matches!(
            service.get_wallet_by_user(UserId::new()).await,
            Err(SagaError::NotFound { entity: "wallet", .. })
        ));
        assert!(service.credit(WalletId::new(), Money::zero()).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_on_debit() {
        let service = InMemoryFundsService::new();
        let wallet = service.open_wallet(UserId::new(), Money::from_dollars(5)).await;

        service.set_fail_on_debit(true);
        assert!(matches!(
            service.debit(wallet.id, Money::from_dollars(1)).await,
            Err(SagaError::Upstream(_))
        ));

        service.set_fail_on_debit(false);
        assert!(service.debit(wallet.id, Money::from_dollars(1)).await.is_ok());
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use qbank_core::model::{PasswordHash, QuestionId};
use qbank_core::time::{fixed_clock, fixed_now};
use services::{AccountError, AccountService, PasswordHasher};
use storage::json::JsonUserStore;
use storage::{InMemoryRepository, StorageError, UserDirectory, UserStore};

struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> PasswordHash {
        PasswordHash::new(format!("plain:{password}"))
    }
}

#[tokio::test]
async fn signup_login_logout_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let accounts = AccountService::new(fixed_clock(), Arc::new(JsonUserStore::new(&path)));

    let account = accounts.create_user("  rae ", "secret").await.unwrap();
    assert_eq!(account.username.as_str(), "rae");
    assert_eq!(account.created_at, fixed_now());
    assert!(account.progress.attempted().is_empty());

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        raw["rae"]["password_hash"],
        "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
    );

    let mut ctx = accounts.login("rae", "secret").await.unwrap();
    assert_eq!(ctx.logged_in_at(), fixed_now());
    ctx.progress_mut().mark(QuestionId::new("12"));
    accounts.logout(ctx).await.unwrap();

    let ctx = accounts.login("rae", "secret").await.unwrap();
    assert!(ctx.progress().is_marked(&QuestionId::new("12")));
}

#[tokio::test]
async fn signup_rejects_taken_and_blank_input() {
    let accounts = AccountService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
    accounts.create_user("sam", "pw").await.unwrap();

    assert!(matches!(
        accounts.create_user("sam", "other").await,
        Err(AccountError::UsernameTaken(_))
    ));
    assert!(matches!(
        accounts.create_user("   ", "pw").await,
        Err(AccountError::InvalidUsername(_))
    ));
    assert!(matches!(
        accounts.create_user("tess", "").await,
        Err(AccountError::EmptyPassword)
    ));
}

#[tokio::test]
async fn login_rejects_unknown_users_and_bad_passwords() {
    let accounts = AccountService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
    accounts.create_user("uma", "right").await.unwrap();

    assert!(matches!(
        accounts.login("vic", "right").await,
        Err(AccountError::UnknownUser(_))
    ));
    assert!(matches!(
        accounts.login("uma", "wrong").await,
        Err(AccountError::InvalidPassword)
    ));
}

#[tokio::test]
async fn custom_hasher_is_used_for_signup_and_login() {
    let store = InMemoryRepository::new();
    let accounts = AccountService::new(fixed_clock(), Arc::new(store.clone()))
        .with_hasher(Arc::new(PlainHasher));
    accounts.create_user("wes", "pw").await.unwrap();

    let users = store.read_all().await.unwrap();
    let stored = users.values().next().unwrap();
    assert_eq!(stored.password_hash.as_str(), "plain:pw");
    accounts.login("wes", "pw").await.unwrap();
}

/// Serves the first read, then fails every later one.
#[derive(Clone, Default)]
struct FailsAfterFirstRead {
    inner: InMemoryRepository,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl UserStore for FailsAfterFirstRead {
    async fn read_all(&self) -> Result<UserDirectory, StorageError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(StorageError::Io("disk unplugged".into()));
        }
        self.inner.read_all().await
    }

    async fn write_all(&self, users: &UserDirectory) -> Result<(), StorageError> {
        self.inner.write_all(users).await
    }
}

#[tokio::test]
async fn login_degrades_to_empty_progress_when_progress_read_fails() {
    let store = FailsAfterFirstRead::default();
    let setup = AccountService::new(fixed_clock(), Arc::new(store.inner.clone()));
    setup.create_user("xia", "pw").await.unwrap();
    let mut ctx = setup.login("xia", "pw").await.unwrap();
    ctx.progress_mut().mark(QuestionId::new("4"));
    setup.logout(ctx).await.unwrap();

    let accounts = AccountService::new(fixed_clock(), Arc::new(store.clone()));
    let ctx = accounts.login("xia", "pw").await.unwrap();
    assert!(ctx.progress().marked().is_empty());
    assert_eq!(store.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn corrupt_neighbour_does_not_block_login_or_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let accounts = AccountService::new(fixed_clock(), Arc::new(JsonUserStore::new(&path)));
    accounts.create_user("good", "pw").await.unwrap();

    let mut raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    raw["bad"] = serde_json::json!({
        "password_hash": "x",
        "created_at": "not-a-date",
        "progress": {}
    });
    std::fs::write(&path, raw.to_string()).unwrap();

    let mut ctx = accounts.login("good", "pw").await.unwrap();
    ctx.progress_mut().mark(QuestionId::new("9"));
    accounts.progress_store().checkpoint(&ctx).await.unwrap();

    let ctx = accounts.login("good", "pw").await.unwrap();
    assert!(ctx.progress().is_marked(&QuestionId::new("9")));
}

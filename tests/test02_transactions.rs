#![cfg(feature = "sqlite")]

use sql_pdo::prelude::*;
use tempfile::tempdir;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

async fn ledger(prefix: &str) -> Result<Pdo, PdoError> {
    let pdo = Pdo::new("sqlite", unique_db_path(prefix))?;
    pdo.exec("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER NOT NULL)")
        .await?;
    Ok(pdo)
}

async fn count(pdo: &Pdo) -> Result<String, PdoError> {
    let rows = pdo.query("SELECT COUNT(*) AS n FROM ledger").await?;
    Ok(rows[0].get("n").unwrap_or_default().to_owned())
}

#[tokio::test]
async fn begin_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let pdo = ledger("idempotent").await?;
    assert!(!pdo.in_transaction().await);

    pdo.begin_transaction().await?;
    assert!(pdo.in_transaction().await);

    pdo.exec("INSERT INTO ledger (amount) VALUES (10)").await?;
    // a second begin keeps the same transaction and its uncommitted work
    pdo.begin_transaction().await?;
    assert!(pdo.in_transaction().await);
    assert_eq!(count(&pdo).await?, "1");

    pdo.roll_back().await?;
    assert!(!pdo.in_transaction().await);
    assert_eq!(count(&pdo).await?, "0");
    Ok(())
}

#[tokio::test]
async fn commit_persists_work() -> Result<(), Box<dyn std::error::Error>> {
    let pdo = ledger("commit").await?;

    pdo.begin_transaction().await?;
    assert_eq!(pdo.exec("INSERT INTO ledger (amount) VALUES (1), (2), (3)").await?, 3);
    assert_eq!(count(&pdo).await?, "3");
    pdo.commit().await?;
    assert!(!pdo.in_transaction().await);

    // a fresh handle on the same file sees the committed rows
    let other = Pdo::new("sqlite", pdo.dsn())?;
    assert_eq!(count(&other).await?, "3");
    Ok(())
}

#[tokio::test]
async fn uncommitted_work_is_invisible_to_other_handles() -> Result<(), Box<dyn std::error::Error>> {
    let pdo = ledger("isolation").await?;
    let other = Pdo::new("sqlite", pdo.dsn())?;

    pdo.begin_transaction().await?;
    pdo.exec("INSERT INTO ledger (amount) VALUES (5)").await?;
    assert_eq!(count(&pdo).await?, "1");
    assert_eq!(count(&other).await?, "0");

    pdo.roll_back().await?;
    assert_eq!(count(&pdo).await?, "0");
    Ok(())
}

#[tokio::test]
async fn state_violations_are_errors() -> Result<(), Box<dyn std::error::Error>> {
    let pdo = ledger("violations").await?;

    let err = pdo.commit().await.unwrap_err();
    assert!(matches!(err, PdoError::NotInTransaction(_)), "{err:?}");
    assert!(err.is_transaction_state());

    let err = pdo.roll_back().await.unwrap_err();
    assert!(matches!(err, PdoError::NotInTransaction(_)), "{err:?}");

    pdo.begin_transaction().await?;
    let err = pdo.prepare("SELECT * FROM ledger").await.unwrap_err();
    assert!(matches!(err, PdoError::TransactionActive(_)), "{err:?}");
    pdo.roll_back().await?;

    // preparing works again once the transaction is over
    pdo.prepare("SELECT * FROM ledger").await?;
    Ok(())
}

#[tokio::test]
async fn failed_statement_leaves_transaction_open() -> Result<(), Box<dyn std::error::Error>> {
    let pdo = ledger("failed_in_tx").await?;

    pdo.begin_transaction().await?;
    pdo.exec("INSERT INTO ledger (amount) VALUES (1)").await?;
    assert!(pdo.exec("INSERT INTO ledger (amount) VALUES (NULL)").await.is_err());
    assert!(pdo.in_transaction().await);

    pdo.commit().await?;
    assert_eq!(count(&pdo).await?, "1");
    Ok(())
}

#[tokio::test]
async fn clones_and_statements_share_the_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let pdo = ledger("shared").await?;
    let clone = pdo.clone();

    // prepared before the transaction starts
    let mut stmt = pdo.prepare("SELECT COUNT(*) AS n FROM ledger").await?;

    clone.begin_transaction().await?;
    assert!(pdo.in_transaction().await);

    pdo.exec("INSERT INTO ledger (amount) VALUES (7)").await?;
    let rows = stmt.fetch_all().await?;
    assert_eq!(rows[0].get("n"), Some("1"));

    clone.roll_back().await?;
    assert!(!pdo.in_transaction().await);
    let rows = stmt.fetch_all().await?;
    assert_eq!(rows[0].get("n"), Some("0"));
    Ok(())
}

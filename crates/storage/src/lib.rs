pub mod db;

pub use db::{
    create_db, get_audit_entries, get_match_for_pair, get_matches, get_transaction,
    get_transaction_for_update, get_transactions_by_source, get_unmatched_by_source,
    insert_audit_entry, insert_match,
    insert_transaction, set_transaction_status, DbPool, NewTransaction,
};

pub mod option_store_sqlx;

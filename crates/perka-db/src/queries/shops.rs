//! Shop query functions.

use rusqlite::{Connection, OptionalExtension};

use perka_types::purchase::Shop;

use crate::{DbError, Result};

/// Register a shop.
pub fn insert(conn: &Connection, shop: &Shop) -> Result<()> {
    conn.execute(
        "INSERT INTO shops (id, name, payout_address) VALUES (?1, ?2, ?3)",
        rusqlite::params![shop.id, shop.name, shop.payout_address],
    )?;
    Ok(())
}

/// Fetch a shop row.
///
/// Loading the row inside an open transaction is the serialization point
/// for batch settlement of that shop.
///
/// # Errors
///
/// - [`DbError::NotFound`] if no shop exists for the id
pub fn get(conn: &Connection, shop_id: &str) -> Result<Shop> {
    conn.query_row(
        "SELECT id, name, payout_address FROM shops WHERE id = ?1",
        [shop_id],
        |row| {
            Ok(Shop {
                id: row.get(0)?,
                name: row.get(1)?,
                payout_address: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(DbError::Sqlite)?
    .ok_or_else(|| DbError::NotFound(format!("shop {shop_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_shop() -> Shop {
        Shop {
            id: "shop-1".to_string(),
            name: "Corner Espresso".to_string(),
            payout_address: "0xshop1".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample_shop()).expect("insert");
        let shop = get(&conn, "shop-1").expect("get");
        assert_eq!(shop, sample_shop());
    }

    #[test]
    fn test_get_unknown_shop() {
        let conn = crate::open_memory().expect("open");
        assert!(matches!(get(&conn, "nope"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample_shop()).expect("insert");
        assert!(insert(&conn, &sample_shop()).is_err());
    }
}

pub mod statements;

use crate::connection::CqlContext;
use crate::core::{AdapterError, Result};
use crate::model::ShoppingCart;
use scylla::frame::response::result::CqlValue;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Typed data access object for the `shoppingcart` table.
///
/// Every method is one statement against the shared session at the
/// statement's configured consistency level. Failures propagate; there are
/// no retries and no downgrades in this layer.
pub struct CartDao {
    ctx: Arc<CqlContext>,
}

impl CartDao {
    pub fn new(ctx: Arc<CqlContext>) -> Self {
        Self { ctx }
    }

    /// Point lookup by identifier.
    pub async fn get(&self, key: &str) -> Result<Option<ShoppingCart>> {
        let statement = self.ctx.singleton_statement(statements::READ_ALL).await?;
        let result = self.ctx.session().execute(&statement, (key,)).await?;
        result
            .maybe_first_row_typed::<ShoppingCart>()
            .map_err(|e| AdapterError::Decode(e.to_string()))
    }

    /// Insert a full record.
    pub async fn save(&self, cart: &ShoppingCart) -> Result<()> {
        let fields = ShoppingCart::regular_field_set();
        let statement = self.ctx.insert_statement(&fields).await?;
        let mut values = Vec::with_capacity(fields.len() + 1);
        values.push(CqlValue::Text(cart.id.clone()));
        values.extend(bind_fields(cart, &fields)?);
        self.ctx.session().execute(&statement, values).await?;
        Ok(())
    }

    /// Overwrite a full record in place.
    pub async fn update(&self, cart: &ShoppingCart) -> Result<()> {
        let fields = ShoppingCart::regular_field_set();
        let statement = self.ctx.update_statement(&fields).await?;
        let mut values = bind_fields(cart, &fields)?;
        values.push(CqlValue::Text(cart.id.clone()));
        self.ctx.session().execute(&statement, values).await?;
        Ok(())
    }

    /// Delete by identifier. A missing row is indistinguishable from a
    /// present one.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let statement = self.ctx.singleton_statement(statements::DELETE).await?;
        self.ctx.session().execute(&statement, (key,)).await?;
        Ok(())
    }

    /// Canned search-index query: at most one open draft cart.
    pub async fn find_open_drafts(&self) -> Result<Option<ShoppingCart>> {
        self.canned(statements::FIND_OPEN_DRAFTS).await
    }

    /// Canned search-index query: at most one open draft cart inside the
    /// fixed modification and expiry windows.
    pub async fn find_by_activity_window(&self) -> Result<Option<ShoppingCart>> {
        self.canned(statements::FIND_BY_ACTIVITY_WINDOW).await
    }

    async fn canned(&self, name: &'static str) -> Result<Option<ShoppingCart>> {
        let statement = self.ctx.singleton_statement(name).await?;
        let result = self.ctx.session().execute(&statement, ()).await?;
        result
            .maybe_first_row_typed::<ShoppingCart>()
            .map_err(|e| AdapterError::Decode(e.to_string()))
    }

    /// Token-range scan starting at `start_key`, at most `limit` rows.
    pub async fn scan_from(&self, start_key: &str, limit: i32) -> Result<Vec<ShoppingCart>> {
        let statement = self.ctx.singleton_statement(statements::SCAN_ALL).await?;
        let result = self
            .ctx
            .session()
            .execute(&statement, (start_key, limit))
            .await?;
        let rows = result
            .rows_typed::<ShoppingCart>()
            .map_err(|e| AdapterError::Decode(e.to_string()))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AdapterError::Decode(e.to_string()))
    }
}

/// Bind values for the requested non-key fields, in generation order.
fn bind_fields(cart: &ShoppingCart, fields: &BTreeSet<String>) -> Result<Vec<CqlValue>> {
    statements::ordered_fields(fields)
        .map(|field| {
            cart.value_of(field)
                .ok_or_else(|| AdapterError::UnknownField(field.clone()))
        })
        .collect()
}

//! Request and response bodies for the document store REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::CoinId;

pub(super) const COIN_FIELD: &str = "crypto";
pub(super) const USER_FIELD: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ValueDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) string_value: Option<String>,
}

impl ValueDto {
    pub(super) fn string(value: &str) -> Self {
        Self {
            string_value: Some(value.to_owned()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct NewDocumentDto {
    pub(super) fields: BTreeMap<&'static str, ValueDto>,
}

impl NewDocumentDto {
    pub(super) fn record(user: &str, coin: &str) -> Self {
        Self {
            fields: BTreeMap::from([
                (COIN_FIELD, ValueDto::string(coin)),
                (USER_FIELD, ValueDto::string(user)),
            ]),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RunQueryDto {
    pub(super) structured_query: StructuredQueryDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StructuredQueryDto {
    pub(super) from: Vec<CollectionSelectorDto>,
    #[serde(rename = "where")]
    pub(super) filter: FilterDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CollectionSelectorDto {
    pub(super) collection_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) enum FilterDto {
    FieldFilter(FieldFilterDto),
    CompositeFilter(CompositeFilterDto),
}

#[derive(Debug, Serialize)]
pub(super) struct FieldFilterDto {
    pub(super) field: FieldReferenceDto,
    pub(super) op: &'static str,
    pub(super) value: ValueDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FieldReferenceDto {
    pub(super) field_path: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct CompositeFilterDto {
    pub(super) op: &'static str,
    pub(super) filters: Vec<FilterDto>,
}

fn equals(field_path: &'static str, value: &str) -> FilterDto {
    FilterDto::FieldFilter(FieldFilterDto {
        field: FieldReferenceDto { field_path },
        op: "EQUAL",
        value: ValueDto::string(value),
    })
}

impl RunQueryDto {
    /// Every record owned by `user`.
    pub(super) fn by_user(collection: &str, user: &str) -> Self {
        Self::with_filter(collection, equals(USER_FIELD, user))
    }

    /// Records matching the exact `(user, coin)` pair.
    pub(super) fn by_pair(collection: &str, user: &str, coin: &str) -> Self {
        Self::with_filter(
            collection,
            FilterDto::CompositeFilter(CompositeFilterDto {
                op: "AND",
                filters: vec![equals(COIN_FIELD, coin), equals(USER_FIELD, user)],
            }),
        )
    }

    fn with_filter(collection: &str, filter: FilterDto) -> Self {
        Self {
            structured_query: StructuredQueryDto {
                from: vec![CollectionSelectorDto {
                    collection_id: collection.to_owned(),
                }],
                filter,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryRowDto {
    pub(super) document: Option<DocumentDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DocumentDto {
    pub(super) name: String,
    #[serde(default)]
    pub(super) fields: BTreeMap<String, ValueDto>,
}

impl DocumentDto {
    pub(super) fn coin(&self) -> Result<CoinId, String> {
        let raw = self
            .fields
            .get(COIN_FIELD)
            .and_then(|value| value.string_value.as_deref())
            .ok_or_else(|| format!("document {} has no {COIN_FIELD} string", self.name))?;
        CoinId::new(raw)
            .map_err(|error| format!("document {} has invalid coin: {error}", self.name))
    }
}

/// Documents present in a query response; rows without one only carry read
/// metadata.
pub(super) fn documents(rows: Vec<QueryRowDto>) -> Vec<DocumentDto> {
    rows.into_iter().filter_map(|row| row.document).collect()
}

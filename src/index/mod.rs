//! Index descriptors and the positional multi-index contract
//!
//! An `Index<T>` is an immutable named handle for one remote collection. The
//! shape parameter `T` is a compile-time tag only; descriptors are
//! interchangeable for subscription purposes iff their names are equal.

use crate::error::SearchError;
use crate::results::{decode_response, SearchResponse};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Named handle for one logical remote search collection
pub struct Index<T = serde_json::Value> {
    /// Collection name on the backend
    pub name: String,
    shape: PhantomData<fn() -> T>,
}

impl<T> Index<T> {
    /// Create a descriptor for `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: PhantomData,
        }
    }

    /// Drop the shape tag, keeping only the subscription identity
    pub fn erase(&self) -> Index {
        Index::new(self.name.clone())
    }
}

impl<T> Clone for Index<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            shape: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Index<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index").field("name", &self.name).finish()
    }
}

impl<T> PartialEq for Index<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Index<T> {}

/// A fixed tuple of index descriptors queried in one combined round trip.
///
/// The response type mirrors the input tuple position by position: the
/// response at position `i` is typed per the descriptor at position `i`.
pub trait IndexSet: Send + Sync + 'static {
    /// Positional responses, typed per the input descriptors
    type Responses: Clone + Send + Sync + 'static;

    /// Descriptor names, in query order
    fn names(&self) -> Vec<String>;

    /// Decode positional raw responses into the declared shapes
    fn decode(
        &self,
        raw: Vec<SearchResponse<serde_json::Value>>,
    ) -> Result<Self::Responses, SearchError>;
}

macro_rules! impl_index_set {
    ($len:expr => $($t:ident),+) => {
        impl<$($t),+> IndexSet for ($(Index<$t>,)+)
        where
            $($t: DeserializeOwned + Clone + Send + Sync + 'static,)+
        {
            type Responses = ($(SearchResponse<$t>,)+);

            fn names(&self) -> Vec<String> {
                #[allow(non_snake_case)]
                let ($($t,)+) = self;
                vec![$($t.name.clone()),+]
            }

            fn decode(
                &self,
                raw: Vec<SearchResponse<serde_json::Value>>,
            ) -> Result<Self::Responses, SearchError> {
                if raw.len() != $len {
                    return Err(SearchError::ResponseCountMismatch {
                        expected: $len,
                        got: raw.len(),
                    });
                }
                let mut raw = raw.into_iter();
                Ok(($(
                    decode_response::<$t>(raw.next().expect("length checked")),
                )+))
            }
        }
    };
}

impl_index_set!(1 => A);
impl_index_set!(2 => A, B);
impl_index_set!(3 => A, B, C);
impl_index_set!(4 => A, B, C, D);

/// Dynamic homogeneous set: any number of erased descriptors
impl IndexSet for Vec<Index> {
    type Responses = Vec<SearchResponse>;

    fn names(&self) -> Vec<String> {
        self.iter().map(|index| index.name.clone()).collect()
    }

    fn decode(
        &self,
        raw: Vec<SearchResponse<serde_json::Value>>,
    ) -> Result<Self::Responses, SearchError> {
        if raw.len() != self.len() {
            return Err(SearchError::ResponseCountMismatch {
                expected: self.len(),
                got: raw.len(),
            });
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Hit;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Product {
        name: String,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Page {
        title: String,
    }

    #[test]
    fn test_identity_by_name() {
        let a: Index<Product> = Index::new("products");
        let b: Index<Product> = Index::new("products");
        let c: Index<Product> = Index::new("pages");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.erase().name, "products");
    }

    #[test]
    fn test_tuple_decode_positional() {
        let set = (Index::<Product>::new("products"), Index::<Page>::new("pages"));
        assert_eq!(set.names(), vec!["products", "pages"]);

        let raw = vec![
            SearchResponse {
                hits: vec![Hit::new("p1", json!({"name": "boot"}))],
                ..Default::default()
            },
            SearchResponse {
                hits: vec![Hit::new("g1", json!({"title": "about"}))],
                ..Default::default()
            },
        ];
        let (products, pages) = set.decode(raw).unwrap();
        assert_eq!(products.hits[0].data.name, "boot");
        assert_eq!(pages.hits[0].data.title, "about");
    }

    #[test]
    fn test_tuple_decode_count_mismatch() {
        let set = (Index::<Product>::new("products"), Index::<Page>::new("pages"));
        let err = set.decode(vec![SearchResponse::default()]).unwrap_err();
        assert!(matches!(
            err,
            SearchError::ResponseCountMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn test_dynamic_set() {
        let set = vec![Index::new("a"), Index::new("b")];
        assert_eq!(set.names().len(), 2);
        let out = set
            .decode(vec![SearchResponse::default(), SearchResponse::default()])
            .unwrap();
        assert_eq!(out.len(), 2);
    }
}

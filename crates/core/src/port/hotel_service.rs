// Hotel Service Port: favourite contractors for FAVOURITE audiences

use crate::domain::UserId;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait HotelService: Send + Sync {
    async fn favourites(&self, hotel_id: &str) -> Result<HashSet<UserId>>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;

    /// Fixed favourites per hotel; unknown hotels have none
    #[derive(Default)]
    pub struct StaticHotelService {
        favourites: HashMap<String, HashSet<UserId>>,
    }

    impl StaticHotelService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_favourites<I, S>(mut self, hotel_id: &str, contractors: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.favourites.insert(
                hotel_id.to_string(),
                contractors.into_iter().map(Into::into).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl HotelService for StaticHotelService {
        async fn favourites(&self, hotel_id: &str) -> Result<HashSet<UserId>> {
            Ok(self.favourites.get(hotel_id).cloned().unwrap_or_default())
        }
    }
}

use indexmap::IndexMap;

/// Conversion into `application/x-www-form-urlencoded` key/value pairs.
pub trait UrlEncodable {
    fn params(self) -> IndexMap<String, String>;
}

impl<A, B> UrlEncodable for (A, B)
where
    A: UrlEncodable,
    B: UrlEncodable,
{
    fn params(self) -> IndexMap<String, String> {
        let (first, second) = self;
        let mut params = first.params();
        params.extend(second.params());
        params
    }
}

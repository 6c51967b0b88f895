//! Query construction from raw list parameters.
//!
//! [`QueryBuilder`] reads a [`QueryRequest`] step by step (search, filter,
//! sort, paginate, fields) and is consumed by [`QueryBuilder::build`] into
//! an immutable [`PreparedQuery`]. Only a prepared query can run reads, so a
//! half-built filter is never executed.

use murmur_proto::request::{FIELDS, LIMIT, PAGE, SEARCH_TERM, SORT};
use murmur_proto::{
    Error as ProtoError, FilterExpr, FilterOp, Limit, OrderSpec, PageWindow, PaginationMeta,
    Projection, QueryDescriptor, QueryParam, QueryRequest, Value,
};
use serde::Serialize;

use crate::error::QueryError;
use crate::handle::{Document, QueryableHandle};

/// Suffix that marks an inclusive lower bound on a declared range field.
const RANGE_MIN_SUFFIX: &str = "Min";
/// Suffix that marks an inclusive upper bound on a declared range field.
const RANGE_MAX_SUFFIX: &str = "Max";

/// Incremental builder over a scoped base handle.
#[derive(Debug, Clone)]
pub struct QueryBuilder<H> {
    handle: H,
    request: QueryRequest,
    range_fields: Vec<String>,
    max_limit: Option<u64>,
    allow_unbounded: bool,
    descriptor: QueryDescriptor,
}

impl<H: QueryableHandle> QueryBuilder<H> {
    /// Create a builder over `handle`, which the caller may already have
    /// scoped (e.g. to a role). The request is copied.
    pub fn new(handle: H, request: &QueryRequest) -> Self {
        Self {
            handle,
            request: request.clone(),
            range_fields: Vec::new(),
            max_limit: None,
            allow_unbounded: true,
            descriptor: QueryDescriptor::default(),
        }
    }

    /// Declare fields that accept `<field>Min` / `<field>Max` parameters.
    pub fn with_range_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.range_fields = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    /// Clamp counted page sizes to at most `max`.
    pub fn with_max_limit(mut self, max: u64) -> Self {
        self.max_limit = Some(max.max(1));
        self
    }

    /// Whether `limit=all` is accepted. Enabled by default.
    pub fn allow_unbounded(mut self, allow: bool) -> Self {
        self.allow_unbounded = allow;
        self
    }

    /// AND a case-insensitive substring match over `fields` into the
    /// filter, when the request carries a non-blank `searchTerm`.
    pub fn search<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        let term = match self.request.get_str(SEARCH_TERM).map(str::trim) {
            Some(term) if !term.is_empty() => term.to_string(),
            _ => return self,
        };
        if fields.is_empty() {
            return self;
        }

        let any_field = FilterExpr::or(
            fields
                .iter()
                .map(|f| FilterExpr::contains(f.as_ref(), term.clone()))
                .collect(),
        );
        self.descriptor.filter = FilterExpr::merge(self.descriptor.filter.take(), any_field);
        self
    }

    /// AND a predicate for every non-reserved parameter into the filter.
    ///
    /// Plain values become equality, repeated values become `In`, and
    /// bracket operators become comparisons. An unknown operator fails the
    /// whole step.
    pub fn filter(mut self) -> Result<Self, QueryError> {
        let mut predicates = Vec::new();
        for (key, param) in self.request.filterable() {
            if let Some(expr) = self.range_predicate(key, param)? {
                predicates.push(expr);
                continue;
            }
            match param {
                QueryParam::Single(value) => predicates.push(FilterExpr::eq(key, value.as_str())),
                QueryParam::Multi(values) => predicates.push(FilterExpr::in_values(
                    key,
                    values.iter().map(|v| Value::from(v.as_str())).collect(),
                )),
                QueryParam::Operators(ops) => {
                    for (op, raw) in ops {
                        predicates.push(operator_predicate(key, FilterOp::parse(key, op)?, raw));
                    }
                }
            }
        }

        for expr in predicates {
            self.descriptor.filter = FilterExpr::merge(self.descriptor.filter.take(), expr);
        }
        Ok(self)
    }

    fn range_predicate(
        &self,
        key: &str,
        param: &QueryParam,
    ) -> Result<Option<FilterExpr>, QueryError> {
        let (field, lower) = if let Some(stem) = key.strip_suffix(RANGE_MIN_SUFFIX) {
            (stem, true)
        } else if let Some(stem) = key.strip_suffix(RANGE_MAX_SUFFIX) {
            (stem, false)
        } else {
            return Ok(None);
        };
        if !self.range_fields.iter().any(|f| f == field) {
            return Ok(None);
        }

        let raw = param.as_single().ok_or_else(|| {
            ProtoError::invalid(format!("'{key}' takes a single value"))
        })?;
        Ok(Some(if lower {
            FilterExpr::ge(field, raw)
        } else {
            FilterExpr::le(field, raw)
        }))
    }

    /// Set the ordering from `sort`, defaulting to newest first.
    pub fn sort(mut self) -> Result<Self, QueryError> {
        self.descriptor.order_by = match self.request.get_str(SORT).map(str::trim) {
            Some(spec) if !spec.is_empty() => OrderSpec::parse_list(spec)?,
            _ => OrderSpec::default_order(),
        };
        Ok(self)
    }

    /// Resolve the page window from `page` and `limit`.
    pub fn paginate(mut self) -> Result<Self, QueryError> {
        let mut window =
            PageWindow::resolve(self.request.get_str(PAGE), self.request.get_str(LIMIT))?;

        match window.limit {
            Limit::All if !self.allow_unbounded => {
                return Err(ProtoError::invalid("limit=all is not allowed here").into());
            }
            Limit::Count(n) => {
                if let Some(max) = self.max_limit {
                    window.limit = Limit::Count(n.min(max));
                }
            }
            Limit::All => {}
        }

        self.descriptor.window = Some(window);
        Ok(self)
    }

    /// Restrict returned fields from `fields`.
    pub fn fields(mut self) -> Result<Self, QueryError> {
        self.descriptor.projection = match self.request.get_str(FIELDS).map(str::trim) {
            Some(spec) if !spec.is_empty() => Some(Projection::parse(spec)?),
            _ => None,
        };
        Ok(self)
    }

    /// The descriptor accumulated so far.
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Finish the chain.
    pub fn build(self) -> PreparedQuery<H> {
        tracing::debug!(
            filter = ?self.descriptor.filter,
            order_by = ?self.descriptor.order_by,
            window = ?self.descriptor.window,
            projection = ?self.descriptor.projection,
            "query built"
        );
        PreparedQuery {
            base: self.handle,
            descriptor: self.descriptor,
        }
    }
}

fn operator_predicate(field: &str, op: FilterOp, raw: &str) -> FilterExpr {
    let list = || {
        raw.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(Value::from)
            .collect::<Vec<_>>()
    };
    match op {
        FilterOp::Eq => FilterExpr::eq(field, raw),
        FilterOp::Ne => FilterExpr::ne(field, raw),
        FilterOp::Gt => FilterExpr::gt(field, raw),
        FilterOp::Gte => FilterExpr::ge(field, raw),
        FilterOp::Lt => FilterExpr::lt(field, raw),
        FilterOp::Lte => FilterExpr::le(field, raw),
        FilterOp::In => FilterExpr::in_values(field, list()),
        FilterOp::Nin => FilterExpr::not_in_values(field, list()),
    }
}

/// One page of results with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Documents in the window.
    pub data: Vec<Document>,
    /// Pagination metadata for the whole match set.
    pub meta: PaginationMeta,
}

/// An immutable, fully resolved query over a base handle.
#[derive(Debug, Clone)]
pub struct PreparedQuery<H> {
    base: H,
    descriptor: QueryDescriptor,
}

impl<H: QueryableHandle> PreparedQuery<H> {
    /// The resolved query.
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// The window used for metadata: the resolved one, or the defaults
    /// when pagination was not requested.
    pub fn window(&self) -> PageWindow {
        self.descriptor.window.unwrap_or_default()
    }

    /// Base handle with the filter applied.
    fn filtered(&self) -> H {
        match &self.descriptor.filter {
            Some(filter) => self.base.clone().and_where(filter.clone()),
            None => self.base.clone(),
        }
    }

    /// Fetch the documents in the window.
    pub async fn execute(&self) -> Result<Vec<Document>, QueryError> {
        let mut handle = self.filtered();
        if !self.descriptor.order_by.is_empty() {
            handle = handle.sort_by(self.descriptor.order_by.clone());
        }
        if let Some(window) = &self.descriptor.window {
            if let (Some(skip), Some(take)) = (window.skip(), window.take()) {
                handle = handle.skip(skip).limit(take);
            }
        }
        if let Some(projection) = &self.descriptor.projection {
            handle = handle.select(projection.clone());
        }
        Ok(handle.execute().await?)
    }

    /// Count matches and compute pagination metadata. Ordering, window and
    /// projection do not influence the total.
    pub async fn count_total(&self) -> Result<PaginationMeta, QueryError> {
        let total = self.filtered().count().await?;
        Ok(PaginationMeta::new(&self.window(), total))
    }

    /// Run retrieval and count against the same descriptor.
    pub async fn fetch(&self) -> Result<Page, QueryError> {
        let (data, meta) = tokio::try_join!(self.execute(), self.count_total())?;
        Ok(Page { data, meta })
    }
}

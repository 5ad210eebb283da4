use {
    std::{collections::HashMap, fmt::Debug},
    tracing::debug,
    futures::{future::BoxFuture, FutureExt},
    aws_config::BehaviorVersion,
    aws_sdk_dynamodb::{
        Client,
        config::Region,
        error::{SdkError, DisplayErrorContext, ProvideErrorMetadata},
        types::AttributeValue,
    },
    visits_core::CounterRecord,
    crate::{
        config::CounterConfig,
        store::{CounterStore, StorageError},
    },
};

const VISITS_ATTRIBUTE: &str = "visits";
const THROTTLING_ERROR_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
];

/// Counter records kept in a DynamoDB table, one item per counter.
#[derive(Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
    key_attribute: String,
}

impl DynamoDbStore {
    pub fn new(client: Client, table_name: impl Into<String>, key_attribute: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            key_attribute: key_attribute.into(),
        }
    }

    pub async fn from_config(config: &CounterConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = config.dynamodb_endpoint.as_ref() {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self::new(Client::new(&sdk_config), config.table_name.clone(), config.key_attribute.clone())
    }

    fn key(&self, name: &str) -> (String, AttributeValue) {
        (self.key_attribute.clone(), AttributeValue::S(name.to_owned()))
    }
}

impl CounterStore for DynamoDbStore {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<CounterRecord>, StorageError>> {
        async move {
            let (key_name, key_value) = self.key(name);
            let output = self.client.get_item()
                .table_name(&self.table_name)
                .key(key_name, key_value)
                .consistent_read(true)
                .send()
                .await
                .map_err(storage_error)?;

            let item = match output.item() {
                Some(v) => v,
                None => return Ok(None),
            };

            Ok(Some(CounterRecord::new(name).with_visits(visits_from_item(name, item)?)))
        }.boxed()
    }

    fn create<'a>(&'a self, record: &'a CounterRecord) -> BoxFuture<'a, Result<(), StorageError>> {
        async move {
            let (key_name, key_value) = self.key(&record.name);
            let result = self.client.put_item()
                .table_name(&self.table_name)
                .item(key_name, key_value)
                .item(VISITS_ATTRIBUTE, AttributeValue::N(record.visits.to_string()))
                .condition_expression("attribute_not_exists(#counterKey)")
                .expression_attribute_names("#counterKey", &self.key_attribute)
                .send()
                .await;

            match result {
                Ok(_) => Ok(()),
                Err(err) => if is_conditional_check_failed(&err) {
                    debug!(counter = %record.name, "counter was created by a concurrent request");
                    Ok(())
                } else {
                    Err(storage_error(err))
                },
            }
        }.boxed()
    }

    fn increment<'a>(&'a self, name: &'a str, by: u64) -> BoxFuture<'a, Result<(), StorageError>> {
        async move {
            let (key_name, key_value) = self.key(name);
            self.client.update_item()
                .table_name(&self.table_name)
                .key(key_name, key_value)
                .update_expression("SET visits = visits + :newVisitor")
                .condition_expression("attribute_exists(#counterKey)")
                .expression_attribute_names("#counterKey", &self.key_attribute)
                .expression_attribute_values(":newVisitor", AttributeValue::N(by.to_string()))
                .send()
                .await
                .map_err(|err| if is_conditional_check_failed(&err) {
                    StorageError::RecordNotFound { name: name.to_owned() }
                } else {
                    storage_error(err)
                })
                .map(|_| ())
        }.boxed()
    }
}

fn visits_from_item(name: &str, item: &HashMap<String, AttributeValue>) -> Result<u64, StorageError> {
    let visits = item.get(VISITS_ATTRIBUTE)
        .ok_or_else(|| StorageError::MalformedValue { name: name.to_owned(), description: "item has no visits attribute".to_owned() })?
        .as_n()
        .map_err(|other| StorageError::MalformedValue { name: name.to_owned(), description: format!("visits is not a number: {other:?}") })?;
    visits.parse()
        .map_err(|err| StorageError::MalformedValue { name: name.to_owned(), description: format!("visits is not a non-negative integer: {visits:?}, {err:?}") })
}

fn storage_error<E, R>(err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    let throttled = err.code().map(|code| THROTTLING_ERROR_CODES.contains(&code)).unwrap_or(false);
    let transport = matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_));
    let description = format!("{}", DisplayErrorContext(&err));

    if throttled || transport {
        StorageError::Unavailable { description }
    } else {
        StorageError::InternalError { description }
    }
}

fn is_conditional_check_failed<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    err.code() == Some("ConditionalCheckFailedException")
}

//! 标签管理命令

use anyhow::{Context, Result};
use colored::Colorize;

use vsa_tagging::{
    BulkAction, BulkTagRequest, Cardinality, CategorySpec, InventoryType, ObjectId, TagSpec,
    TaggingClient,
};

use super::common::{connect_tagging, finish_rest, print_json, print_outcome, GlobalOpts};

pub async fn handle(action: crate::TagAction, opts: &GlobalOpts) -> Result<()> {
    // 参数校验在登录之前完成
    let command = TagCommand::parse(action)?;

    let client = connect_tagging(opts).await?;
    let result = command.run(&client).await;
    finish_rest(client, result).await
}

/// 校验后的标签命令
enum TagCommand {
    CategoryList,
    CategoryCreate(CategorySpec),
    CategoryDelete(String),
    List(Option<String>),
    Create {
        name: String,
        category: String,
        description: Option<String>,
    },
    Delete {
        name: String,
        category: String,
    },
    Attach {
        category: CategorySpec,
        tag: String,
        tag_description: Option<String>,
        object: ObjectId,
        replace: bool,
    },
    AttachMultiple {
        object: ObjectId,
        tag_ids: Vec<String>,
    },
    OnObject {
        object_type: String,
        object_ids: Vec<String>,
    },
    Objects {
        category: String,
        tag: String,
    },
    Value {
        category: String,
        object_type: String,
        object_ids: Vec<String>,
    },
    Id {
        category: String,
        tag: String,
    },
    AttachBulk {
        category: CategorySpec,
        tag_description: Option<String>,
        request: BulkTagRequest,
    },
    DetachBulk(BulkTagRequest),
}

fn parse_cardinality(value: &str) -> Result<Cardinality> {
    value
        .parse::<Cardinality>()
        .with_context(|| format!("分类基数无效: {}", value))
}

fn parse_inventory_type(value: &str) -> Result<InventoryType> {
    value
        .parse::<InventoryType>()
        .with_context(|| format!("对象类型无效: {}", value))
}

fn category_spec(
    name: String,
    description: Option<String>,
    cardinality: Option<Cardinality>,
    types: Vec<String>,
) -> CategorySpec {
    let mut spec = CategorySpec::new(name);
    if let Some(description) = description {
        spec = spec.with_description(description);
    }
    if let Some(cardinality) = cardinality {
        spec = spec.with_cardinality(cardinality);
    }
    if !types.is_empty() {
        spec = spec.with_associable_types(types);
    }
    spec
}

impl TagCommand {
    fn parse(action: crate::TagAction) -> Result<Self> {
        use crate::TagAction as A;

        let command = match action {
            A::CategoryList => TagCommand::CategoryList,
            A::CategoryCreate {
                name,
                description,
                cardinality,
                types,
            } => TagCommand::CategoryCreate(category_spec(
                name,
                description,
                Some(parse_cardinality(&cardinality)?),
                types,
            )),
            A::CategoryDelete { name } => TagCommand::CategoryDelete(name),
            A::List { category } => TagCommand::List(category),
            A::Create {
                name,
                category,
                description,
            } => TagCommand::Create {
                name,
                category,
                description,
            },
            A::Delete { name, category } => TagCommand::Delete { name, category },
            A::Attach {
                category,
                tag,
                object_type,
                object_id,
                replace,
                category_description,
                cardinality,
                types,
                tag_description,
            } => {
                let cardinality = cardinality.as_deref().map(parse_cardinality).transpose()?;
                TagCommand::Attach {
                    category: category_spec(category, category_description, cardinality, types),
                    tag,
                    tag_description,
                    object: ObjectId::new(object_type, object_id),
                    replace,
                }
            }
            A::AttachMultiple {
                object_type,
                object_id,
                tag_ids,
            } => TagCommand::AttachMultiple {
                object: ObjectId::new(object_type, object_id),
                tag_ids,
            },
            A::OnObject {
                object_type,
                object_ids,
            } => TagCommand::OnObject {
                object_type,
                object_ids,
            },
            A::Objects { category, tag } => TagCommand::Objects { category, tag },
            A::Value {
                category,
                object_type,
                object_ids,
            } => TagCommand::Value {
                category,
                object_type,
                object_ids,
            },
            A::Id { category, tag } => TagCommand::Id { category, tag },
            A::AttachBulk {
                query_type,
                query_name,
                bulk_type,
                category,
                category_description,
                cardinality,
                types,
                tag,
                tag_description,
                replace,
            } => {
                let cardinality = parse_cardinality(&cardinality)?;
                let request = BulkTagRequest {
                    query_type: parse_inventory_type(&query_type)?,
                    query_name,
                    bulk_type: parse_inventory_type(&bulk_type)?,
                    category: category.clone(),
                    tag,
                    cardinality,
                    action: if replace {
                        BulkAction::Replace
                    } else {
                        BulkAction::Attach
                    },
                };
                TagCommand::AttachBulk {
                    category: category_spec(category, category_description, Some(cardinality), types),
                    tag_description,
                    request,
                }
            }
            A::DetachBulk {
                query_type,
                query_name,
                bulk_type,
                category,
                cardinality,
                tag,
            } => TagCommand::DetachBulk(BulkTagRequest {
                query_type: parse_inventory_type(&query_type)?,
                query_name,
                bulk_type: parse_inventory_type(&bulk_type)?,
                category,
                tag,
                cardinality: parse_cardinality(&cardinality)?,
                action: BulkAction::Detach,
            }),
        };

        Ok(command)
    }

    async fn run(self, client: &TaggingClient) -> Result<()> {
        match self {
            TagCommand::CategoryList => {
                let mut categories = Vec::new();
                for id in client.category().list().await? {
                    categories.push(client.category().get(&id).await?);
                }
                print_json(&categories)
            }
            TagCommand::CategoryCreate(spec) => {
                let category = client.category().get_or_create(&spec).await?;
                print_json(&category)
            }
            TagCommand::CategoryDelete(name) => {
                let category = find_category(client, &name).await?;
                print_json(&client.category().delete(&category.id).await?)?;
                eprintln!("{} 分类 {} 已删除", "✓".green().bold(), name.cyan());
                Ok(())
            }
            TagCommand::List(category) => {
                let category_id = match category {
                    Some(name) => Some(find_category(client, &name).await?.id),
                    None => None,
                };
                let mut tags = Vec::new();
                for id in client.tag().list(category_id.as_deref()).await? {
                    tags.push(client.tag().get(&id).await?);
                }
                print_json(&tags)
            }
            TagCommand::Create {
                name,
                category,
                description,
            } => {
                let category = find_category(client, &category).await?;
                let mut spec = TagSpec::new(name, category.id);
                if let Some(description) = description {
                    spec = spec.with_description(description);
                }
                print_json(&client.tag().get_or_create(&spec).await?)
            }
            TagCommand::Delete { name, category } => {
                let tag_id = client.lookup().tag_id(&category, &name).await?;
                print_json(&client.tag().delete(&tag_id).await?)?;
                eprintln!("{} 标签 {}:{} 已删除", "✓".green().bold(), category, name.cyan());
                Ok(())
            }
            TagCommand::Attach {
                category,
                tag,
                tag_description,
                object,
                replace,
            } => {
                let response = client
                    .bulk()
                    .attach_or_create(&category, &tag, tag_description.as_deref(), &object, replace)
                    .await?;
                print_json(&response)
            }
            TagCommand::AttachMultiple { object, tag_ids } => {
                let response = client.association().attach_multiple(&tag_ids, &object).await?;
                print_json(&response)
            }
            TagCommand::OnObject {
                object_type,
                object_ids,
            } => {
                let tags = client.lookup().tags_for_objects(&object_type, &object_ids).await?;
                print_json(&tags)
            }
            TagCommand::Objects { category, tag } => {
                let tag_id = client.lookup().tag_id(&category, &tag).await?;
                let objects = client.association().list_attached_objects(&tag_id).await?;
                print_json(&objects)
            }
            TagCommand::Value {
                category,
                object_type,
                object_ids,
            } => {
                if let [object_id] = object_ids.as_slice() {
                    let object = ObjectId::new(object_type, object_id.clone());
                    let outcome = client.lookup().tag_values(&category, &object).await?;
                    print_outcome(&outcome)
                } else {
                    let values = client
                        .lookup()
                        .tag_values_for_objects(&category, &object_type, &object_ids)
                        .await?;
                    print_json(&values)
                }
            }
            TagCommand::Id { category, tag } => {
                let tag_id = client.lookup().tag_id(&category, &tag).await?;
                print_json(&tag_id)
            }
            TagCommand::AttachBulk {
                category,
                tag_description,
                request,
            } => {
                // 先按完整参数创建分类和标签，批量关联时直接命中
                client
                    .bulk()
                    .ensure_tag(&category, &request.tag, tag_description.as_deref())
                    .await?;
                let results = client.bulk().tag_bulk(&request).await?;
                eprintln!(
                    "{} 已处理 {} 个 {}",
                    "✓".green().bold(),
                    results.len(),
                    request.bulk_type
                );
                print_json(&results)
            }
            TagCommand::DetachBulk(request) => {
                let outcome = client.bulk().detach_bulk(&request).await?;
                print_outcome(&outcome)
            }
        }
    }
}

async fn find_category(client: &TaggingClient, name: &str) -> Result<vsa_tagging::Category> {
    client
        .category()
        .find_by_name(name)
        .await?
        .with_context(|| format!("Category: '{}' not found!", name))
}

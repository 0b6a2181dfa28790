//! Domain types and schemas shared by the unit tests.

use crate::document::Link;
use crate::resource::Identifier;
use crate::schema::{
    Attributes, Context, Data, Item, ObjectRef, RelationshipDescription, ResourceSchema,
    SchemaContainer,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ── Blog ─────────────────────────────────────────────────────────────

pub struct Person {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn new(id: u32, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

pub struct Comment {
    pub id: u32,
    pub body: String,
    pub author: Arc<Person>,
}

pub struct Post {
    pub id: u32,
    pub title: String,
    pub author: Arc<Person>,
    pub comments: Vec<Arc<Comment>>,
}

pub struct PersonSchema;

impl ResourceSchema for PersonSchema {
    type Object = Person;

    fn resource_type(&self, _person: &Person) -> String {
        "people".into()
    }

    fn id(&self, person: &Person) -> Option<String> {
        Some(person.id.to_string())
    }

    fn attributes(&self, person: &Person, _ctx: &Context<'_>) -> Attributes {
        Attributes::new()
            .with("first_name", &person.first_name)
            .with("last_name", &person.last_name)
    }
}

pub struct CommentSchema;

impl ResourceSchema for CommentSchema {
    type Object = Comment;

    fn resource_type(&self, _comment: &Comment) -> String {
        "comments".into()
    }

    fn id(&self, comment: &Comment) -> Option<String> {
        Some(comment.id.to_string())
    }

    fn attributes(&self, comment: &Comment, _ctx: &Context<'_>) -> Attributes {
        Attributes::new().with("body", &comment.body)
    }

    fn relationships(
        &self,
        comment: &Comment,
        _ctx: &Context<'_>,
    ) -> Vec<(String, RelationshipDescription)> {
        vec![(
            "author".into(),
            RelationshipDescription::new().with_data(Data::shared(comment.author.clone())),
        )]
    }
}

/// Posts only expose comment linkage when comments are included.
pub struct PostSchema;

impl ResourceSchema for PostSchema {
    type Object = Post;

    fn resource_type(&self, _post: &Post) -> String {
        "posts".into()
    }

    fn id(&self, post: &Post) -> Option<String> {
        Some(post.id.to_string())
    }

    fn attributes(&self, post: &Post, _ctx: &Context<'_>) -> Attributes {
        Attributes::new().with("title", &post.title)
    }

    fn relationships(&self, post: &Post, ctx: &Context<'_>) -> Vec<(String, RelationshipDescription)> {
        let author = RelationshipDescription::new().with_data(Data::shared(post.author.clone()));
        let mut comments = RelationshipDescription::new().with_related_link();
        if ctx.is_included("comments") {
            comments = comments.with_data(Data::collection(post.comments.iter().cloned()));
        }
        vec![("author".into(), author), ("comments".into(), comments)]
    }

    fn resource_meta(&self, post: &Post) -> Option<Value> {
        Some(json!({"comment_count": post.comments.len()}))
    }
}

pub struct Blog {
    pub post: Arc<Post>,
    pub author: Arc<Person>,
    pub comments: Vec<Arc<Comment>>,
}

/// Post 1 by person 9, with comments 5 and 12 also written by person 9.
pub fn blog() -> Blog {
    let author = Arc::new(Person::new(9, "Dan", "Gebhardt"));
    let comments = vec![
        Arc::new(Comment {
            id: 5,
            body: "First!".into(),
            author: author.clone(),
        }),
        Arc::new(Comment {
            id: 12,
            body: "I like XML better".into(),
            author: author.clone(),
        }),
    ];
    let post = Arc::new(Post {
        id: 1,
        title: "JSON:API paints my bikeshed!".into(),
        author: author.clone(),
        comments: comments.clone(),
    });
    Blog {
        post,
        author,
        comments,
    }
}

pub fn container() -> SchemaContainer {
    SchemaContainer::new()
        .with_schema(PersonSchema)
        .with_schema(CommentSchema)
        .with_schema(PostSchema)
}

// ── Cyclic graph ─────────────────────────────────────────────────────

pub struct Node {
    pub id: u32,
    pub next: Vec<u32>,
}

/// Resolves `next` through a shared node table and records every
/// relationship read.
pub struct NodeSchema {
    pub nodes: Arc<BTreeMap<u32, Arc<Node>>>,
    pub expansions: Arc<Mutex<Vec<u32>>>,
}

impl ResourceSchema for NodeSchema {
    type Object = Node;

    fn resource_type(&self, _node: &Node) -> String {
        "nodes".into()
    }

    fn id(&self, node: &Node) -> Option<String> {
        Some(node.id.to_string())
    }

    fn attributes(&self, node: &Node, _ctx: &Context<'_>) -> Attributes {
        Attributes::new().with("name", format!("node-{}", node.id))
    }

    fn relationships(&self, node: &Node, _ctx: &Context<'_>) -> Vec<(String, RelationshipDescription)> {
        if let Ok(mut expansions) = self.expansions.lock() {
            expansions.push(node.id);
        }
        let items = node
            .next
            .iter()
            .map(|id| match self.nodes.get(id) {
                Some(next) => Item::Object(ObjectRef::from_arc(next.clone())),
                None => Item::Identifier(Identifier::new("nodes", id.to_string())),
            })
            .collect();
        vec![(
            "next".into(),
            RelationshipDescription::new().with_data(Data::Collection(items)),
        )]
    }
}

/// Build a node table from `(id, next)` edges, returning the container,
/// the table and the expansion log.
pub fn node_graph(
    edges: &[(u32, Vec<u32>)],
) -> (SchemaContainer, Arc<BTreeMap<u32, Arc<Node>>>, Arc<Mutex<Vec<u32>>>) {
    let nodes: BTreeMap<u32, Arc<Node>> = edges
        .iter()
        .map(|(id, next)| {
            (
                *id,
                Arc::new(Node {
                    id: *id,
                    next: next.clone(),
                }),
            )
        })
        .collect();
    let nodes = Arc::new(nodes);
    let expansions = Arc::new(Mutex::new(Vec::new()));
    let container = SchemaContainer::new().with_schema(NodeSchema {
        nodes: nodes.clone(),
        expansions: expansions.clone(),
    });
    (container, nodes, expansions)
}

// ── Broken schemas ───────────────────────────────────────────────────

pub struct Reserved;
pub struct ReservedSchema;

impl ResourceSchema for ReservedSchema {
    type Object = Reserved;

    fn resource_type(&self, _: &Reserved) -> String {
        "reserved".into()
    }

    fn id(&self, _: &Reserved) -> Option<String> {
        Some("1".into())
    }

    fn attributes(&self, _: &Reserved, _ctx: &Context<'_>) -> Attributes {
        Attributes::new().with("name", "x").with("id", "1")
    }
}

pub struct Malformed;
pub struct MalformedSchema;

impl ResourceSchema for MalformedSchema {
    type Object = Malformed;

    fn resource_type(&self, _: &Malformed) -> String {
        "malformed".into()
    }

    fn id(&self, _: &Malformed) -> Option<String> {
        Some("1".into())
    }

    fn attributes(&self, _: &Malformed, _ctx: &Context<'_>) -> Attributes {
        Attributes::new()
    }

    fn relationships(&self, _: &Malformed, _ctx: &Context<'_>) -> Vec<(String, RelationshipDescription)> {
        vec![("empty".into(), RelationshipDescription::new())]
    }
}

pub struct Opaque;
pub struct OpaqueSchema;

impl ResourceSchema for OpaqueSchema {
    type Object = Opaque;

    fn resource_type(&self, _: &Opaque) -> String {
        "opaques".into()
    }

    fn id(&self, _: &Opaque) -> Option<String> {
        Some("1".into())
    }

    fn attributes(&self, _: &Opaque, _ctx: &Context<'_>) -> Attributes {
        let mut handle = BTreeMap::new();
        handle.insert((0u8, 1u8), "socket");
        Attributes::new().with("handle", handle)
    }
}

/// Not yet saved: no id, so no self URL to derive relationship links from.
pub struct Draft;
pub struct DraftSchema;

impl ResourceSchema for DraftSchema {
    type Object = Draft;

    fn resource_type(&self, _: &Draft) -> String {
        "drafts".into()
    }

    fn id(&self, _: &Draft) -> Option<String> {
        None
    }

    fn attributes(&self, _: &Draft, _ctx: &Context<'_>) -> Attributes {
        Attributes::new().with("title", "untitled")
    }

    fn relationships(&self, _: &Draft, _ctx: &Context<'_>) -> Vec<(String, RelationshipDescription)> {
        vec![("author".into(), RelationshipDescription::new().with_related_link())]
    }
}

// ── Links and meta ───────────────────────────────────────────────────

/// A label whose identifiers carry meta and whose `parent` relationship
/// declares an explicit link, a generated self link and meta.
pub struct Label {
    pub id: u32,
    pub parent: Option<Arc<Label>>,
}

pub struct LabelSchema;

impl ResourceSchema for LabelSchema {
    type Object = Label;

    fn resource_type(&self, _: &Label) -> String {
        "labels".into()
    }

    fn id(&self, label: &Label) -> Option<String> {
        Some(label.id.to_string())
    }

    fn attributes(&self, label: &Label, _ctx: &Context<'_>) -> Attributes {
        Attributes::new()
            .with("name", format!("label-{}", label.id))
            .with("color", "red")
    }

    fn relationships(&self, label: &Label, _ctx: &Context<'_>) -> Vec<(String, RelationshipDescription)> {
        vec![(
            "parent".into(),
            RelationshipDescription::new()
                .with_data(Data::optional(label.parent.clone()))
                .with_link("describedby", Link::new("http://schemas.example.com/labels"))
                .with_self_link()
                .with_meta(json!({"depth": 1})),
        )]
    }

    fn identifier_meta(&self, label: &Label) -> Option<Value> {
        Some(json!({"rank": label.id}))
    }
}

//! Shared fixtures for unit tests

use crate::entity::Entity;
use crate::reflect::{FieldRef, Prop, PropertyInfo, Reflect, TypeInfo, ValueKind};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Author {
    pub name: String,
}

impl Reflect for Author {
    fn type_info() -> &'static TypeInfo {
        static INFO: TypeInfo = TypeInfo::new("Author", &[PropertyInfo::scalar("Name", ValueKind::Text)]);
        &INFO
    }

    fn reflect_type(&self) -> &'static TypeInfo {
        Self::type_info()
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "Name" => Some(FieldRef::value(&self.name)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Book {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub author: Option<Author>,
}

impl Book {
    pub const TITLE: Prop<Book, String> = Prop::new("Title");
    pub const AUTHOR: Prop<Book, Author> = Prop::new("Author");

    pub fn new(id: i64, title: &str, year: i32) -> Self {
        Self {
            id,
            title: title.to_string(),
            year,
            author: None,
        }
    }
}

impl Reflect for Book {
    fn type_info() -> &'static TypeInfo {
        static INFO: TypeInfo = TypeInfo::new(
            "Book",
            &[
                PropertyInfo::scalar("Id", ValueKind::Int),
                PropertyInfo::scalar("Title", ValueKind::Text),
                PropertyInfo::scalar("Year", ValueKind::Int),
                PropertyInfo::record("Author", <Author as Reflect>::type_info),
            ],
        );
        &INFO
    }

    fn reflect_type(&self) -> &'static TypeInfo {
        Self::type_info()
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "Id" => Some(FieldRef::value(self.id)),
            "Title" => Some(FieldRef::value(&self.title)),
            "Year" => Some(FieldRef::value(self.year)),
            "Author" => Some(FieldRef::record(self.author.as_ref())),
            _ => None,
        }
    }
}

impl Entity for Book {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Person {
    pub id: i64,
    pub given_name: String,
    pub family_name: String,
    pub age: Option<i32>,
    pub favorite_book: Option<Book>,
    pub books: Vec<Book>,
}

impl Person {
    pub const GIVEN_NAME: Prop<Person, String> = Prop::new("GivenName");
    pub const FAMILY_NAME: Prop<Person, String> = Prop::new("FamilyName");
    pub const AGE: Prop<Person, i32> = Prop::new("Age");
    pub const FAVORITE_BOOK: Prop<Person, Book> = Prop::new("FavoriteBook");
    pub const BOOKS: Prop<Person, Book> = Prop::new("Books");

    pub fn new(id: i64, given_name: &str, family_name: &str, age: i32) -> Self {
        Self {
            id,
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            age: Some(age),
            favorite_book: None,
            books: Vec::new(),
        }
    }

    pub fn with_favorite_book(mut self, book: Book) -> Self {
        self.favorite_book = Some(book);
        self
    }

    pub fn without_age(mut self) -> Self {
        self.age = None;
        self
    }
}

impl Reflect for Person {
    fn type_info() -> &'static TypeInfo {
        static INFO: TypeInfo = TypeInfo::new(
            "Person",
            &[
                PropertyInfo::scalar("Id", ValueKind::Int),
                PropertyInfo::scalar("GivenName", ValueKind::Text),
                PropertyInfo::scalar("FamilyName", ValueKind::Text),
                PropertyInfo::scalar("Age", ValueKind::Int),
                PropertyInfo::record("FavoriteBook", <Book as Reflect>::type_info),
                PropertyInfo::collection("Books", <Book as Reflect>::type_info),
            ],
        );
        &INFO
    }

    fn reflect_type(&self) -> &'static TypeInfo {
        Self::type_info()
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "Id" => Some(FieldRef::value(self.id)),
            "GivenName" => Some(FieldRef::value(&self.given_name)),
            "FamilyName" => Some(FieldRef::value(&self.family_name)),
            "Age" => Some(FieldRef::value(self.age)),
            "FavoriteBook" => Some(FieldRef::record(self.favorite_book.as_ref())),
            "Books" => Some(FieldRef::collection(&self.books)),
            _ => None,
        }
    }
}

impl Entity for Person {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.family_name.trim().is_empty() {
            return Err(format!("person {} has no family name", self.id));
        }
        Ok(())
    }
}

/// Nine people with distinct family names, inserted out of alphabetical order
pub(crate) fn people() -> Vec<Person> {
    vec![
        Person::new(1, "Grace", "Hopper", 85),
        Person::new(2, "Ada", "Lovelace", 36),
        Person::new(3, "Alan", "Turing", 41),
        Person::new(4, "Edsger", "Dijkstra", 72),
        Person::new(5, "Barbara", "Liskov", 84),
        Person::new(6, "Donald", "Knuth", 86),
        Person::new(7, "John", "Backus", 82),
        Person::new(8, "Frances", "Allen", 88),
        Person::new(9, "Ken", "Thompson", 81),
    ]
}

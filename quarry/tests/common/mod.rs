//! Fixtures shared by the integration tests

#![allow(dead_code)]

use quarry::reflect::{FieldRef, Prop, PropertyInfo, Reflect, TypeInfo, ValueKind};
use quarry::store::{MemoryDatabase, MemoryStore};
use quarry::{Entity, UnitOfWork};

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub city: String,
    pub postcode: String,
}

impl Reflect for Address {
    fn type_info() -> &'static TypeInfo {
        static INFO: TypeInfo = TypeInfo::new(
            "Address",
            &[
                PropertyInfo::scalar("City", ValueKind::Text),
                PropertyInfo::scalar("Postcode", ValueKind::Text),
            ],
        );
        &INFO
    }

    fn reflect_type(&self) -> &'static TypeInfo {
        Self::type_info()
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "City" => Some(FieldRef::value(&self.city)),
            "Postcode" => Some(FieldRef::value(&self.postcode)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub address: Option<Address>,
    pub orders: Vec<Order>,
}

impl Customer {
    pub const LAST_NAME: Prop<Customer, String> = Prop::new("LastName");
    pub const AGE: Prop<Customer, i32> = Prop::new("Age");
    pub const ADDRESS: Prop<Customer, Address> = Prop::new("Address");
    pub const ORDERS: Prop<Customer, Order> = Prop::new("Orders");

    pub fn new(id: u32, first_name: &str, last_name: &str, age: i32, city: &str) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
            address: Some(Address {
                city: city.to_string(),
                postcode: format!("{id:05}"),
            }),
            orders: Vec::new(),
        }
    }
}

impl Reflect for Customer {
    fn type_info() -> &'static TypeInfo {
        static INFO: TypeInfo = TypeInfo::new(
            "Customer",
            &[
                PropertyInfo::scalar("Id", ValueKind::Int),
                PropertyInfo::scalar("FirstName", ValueKind::Text),
                PropertyInfo::scalar("LastName", ValueKind::Text),
                PropertyInfo::scalar("Age", ValueKind::Int),
                PropertyInfo::record("Address", <Address as Reflect>::type_info),
                PropertyInfo::collection("Orders", <Order as Reflect>::type_info),
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
            "FirstName" => Some(FieldRef::value(&self.first_name)),
            "LastName" => Some(FieldRef::value(&self.last_name)),
            "Age" => Some(FieldRef::value(self.age)),
            "Address" => Some(FieldRef::record(self.address.as_ref())),
            "Orders" => Some(FieldRef::collection(&self.orders)),
            _ => None,
        }
    }
}

impl Entity for Customer {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }

    fn validate(&self) -> Result<(), String> {
        if self.age < 0 {
            return Err(format!("customer {} has a negative age", self.id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u32,
    pub total_cents: i64,
    pub shipping: Option<Address>,
}

impl Order {
    pub const SHIPPING: Prop<Order, Address> = Prop::new("Shipping");
}

impl Reflect for Order {
    fn type_info() -> &'static TypeInfo {
        static INFO: TypeInfo = TypeInfo::new(
            "Order",
            &[
                PropertyInfo::scalar("Id", ValueKind::Int),
                PropertyInfo::scalar("TotalCents", ValueKind::Int),
                PropertyInfo::record("Shipping", <Address as Reflect>::type_info),
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
            "TotalCents" => Some(FieldRef::value(self.total_cents)),
            "Shipping" => Some(FieldRef::record(self.shipping.as_ref())),
            _ => None,
        }
    }
}

impl Entity for Order {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }
}

/// Nine customers; three share the last name "Smith"
pub fn customers() -> Vec<Customer> {
    vec![
        Customer::new(1, "Olivia", "Smith", 34, "Leeds"),
        Customer::new(2, "Noah", "Brown", 51, "York"),
        Customer::new(3, "Amelia", "Smith", 27, "Bath"),
        Customer::new(4, "Oscar", "Wilson", 45, "Leeds"),
        Customer::new(5, "Isla", "Taylor", 62, "Hull"),
        Customer::new(6, "George", "Smith", 51, "York"),
        Customer::new(7, "Ava", "Evans", 19, "Bath"),
        Customer::new(8, "Harry", "Jones", 38, "Hull"),
        Customer::new(9, "Mia", "Davies", 73, "Leeds"),
    ]
}

/// A database holding [`customers`] and a Unit of Work over a fresh session on it
pub fn seeded() -> (MemoryDatabase, UnitOfWork<MemoryStore>) {
    let db = MemoryDatabase::new();
    db.seed(customers()).expect("seeding an empty database succeeds");
    let uow = UnitOfWork::new(MemoryStore::open(&db));
    (db, uow)
}

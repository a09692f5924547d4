//! Demo catalog fixtures shared by the `serve --seed-demo` flag and the
//! `generate-demo-db` binary.

use crate::database::{Catalog, DatabaseResult};
use crate::models::{NewItem, NewStall};

struct DemoStall {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    items: &'static [DemoItem],
}

struct DemoItem {
    name: &'static str,
    description: &'static str,
    price: f64,
    in_stock: bool,
}

const STALLS: &[DemoStall] = &[
    DemoStall {
        name: "Aling Nena's Gulayan",
        description: "Fresh vegetables straight from Benguet, restocked daily",
        category: "Vegetables",
        items: &[
            DemoItem {
                name: "Fresh Tomatoes",
                description: "Vine ripened, sold per kilo",
                price: 45.0,
                in_stock: true,
            },
            DemoItem {
                name: "Eggplant",
                description: "Long purple talong",
                price: 60.0,
                in_stock: true,
            },
            DemoItem {
                name: "Ampalaya",
                description: "Bitter gourd, great for pinakbet",
                price: 70.0,
                in_stock: false,
            },
        ],
    },
    DemoStall {
        name: "Mang Tomas Seafood",
        description: "Daily catch from Navotas fish port",
        category: "Seafood",
        items: &[
            DemoItem {
                name: "Bangus",
                description: "Boneless milkfish, ready to fry",
                price: 180.0,
                in_stock: true,
            },
            DemoItem {
                name: "Tilapia",
                description: "Live tilapia, per kilo",
                price: 140.0,
                in_stock: true,
            },
            DemoItem {
                name: "Sugpo",
                description: "Jumbo tiger prawns",
                price: 550.0,
                in_stock: false,
            },
        ],
    },
    DemoStall {
        name: "Kakanin Haven",
        description: "Homemade rice cakes and native delicacies",
        category: "Delicacies",
        items: &[
            DemoItem {
                name: "Puto Bumbong",
                description: "Purple rice cake with muscovado and niyog",
                price: 50.0,
                in_stock: true,
            },
            DemoItem {
                name: "Bibingka",
                description: "Charcoal-baked with salted egg and kesong puti",
                price: 75.0,
                in_stock: true,
            },
            DemoItem {
                name: "Sapin-sapin",
                description: "Tri-color sticky rice dessert",
                price: 40.0,
                in_stock: true,
            },
        ],
    },
    DemoStall {
        name: "Tomato Corner",
        description: "All things tomato, from salad to sauce",
        category: "Vegetables",
        items: &[
            DemoItem {
                name: "Cherry Tomatoes",
                description: "Sweet snacking tomatoes, per tub",
                price: 95.0,
                in_stock: true,
            },
            DemoItem {
                name: "Tomato Paste",
                description: "House-made, small jar",
                price: 120.0,
                in_stock: true,
            },
        ],
    },
    DemoStall {
        name: "Lola Caring's Carinderia",
        description: "Lutong bahay, silog meals all day",
        category: "Cooked Food",
        items: &[
            DemoItem {
                name: "Tapsilog",
                description: "Beef tapa, garlic rice, fried egg",
                price: 95.0,
                in_stock: true,
            },
            DemoItem {
                name: "Dinuguan",
                description: "Pork blood stew with puto",
                price: 85.0,
                in_stock: true,
            },
            DemoItem {
                name: "Kare-kare",
                description: "Oxtail in peanut sauce, weekend special",
                price: 150.0,
                in_stock: false,
            },
        ],
    },
];

/// Insert the demo stalls and their items. Intended for an empty catalog.
pub fn seed(catalog: &Catalog) -> DatabaseResult<()> {
    for stall in STALLS {
        let stall_id = catalog.insert_stall(
            &NewStall::new(stall.name)
                .description(stall.description)
                .category(stall.category),
        )?;
        for item in stall.items {
            let mut payload = NewItem::new(stall_id, item.name)
                .description(item.description)
                .price(item.price);
            if !item.in_stock {
                payload = payload.in_stock(false);
            }
            catalog.insert_item(&payload)?;
        }
    }
    Ok(())
}

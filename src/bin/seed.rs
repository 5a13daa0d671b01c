//! Demo tenant seeding tool
//!
//! Run with: cargo run --bin seed
//!
//! Creates TechCorp India with an admin, a manager, an employee reporting to
//! the manager and a handful of sample expenses. Does nothing when the demo
//! admin already exists.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use swift_expense::auth::PasswordHasher;
use swift_expense::domain::{ExpenseCategory, ExpenseStatus, UserRole};
use swift_expense::models::{NewUser, User};
use swift_expense::notifications::{NewNotification, NotificationService, NotificationType};

const COMPANY_NAME: &str = "TechCorp India Private Limited";
const ADMIN_EMAIL: &str = "admin@techcorp.in";

struct DemoUser {
    email: &'static str,
    password: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    role: UserRole,
}

const ADMIN: DemoUser = DemoUser {
    email: ADMIN_EMAIL,
    password: "admin123",
    first_name: "Rajesh",
    last_name: "Sharma",
    role: UserRole::Admin,
};

const MANAGER: DemoUser = DemoUser {
    email: "manager@techcorp.in",
    password: "manager123",
    first_name: "Priya",
    last_name: "Patel",
    role: UserRole::Manager,
};

const EMPLOYEE: DemoUser = DemoUser {
    email: "employee@techcorp.in",
    password: "employee123",
    first_name: "Arjun",
    last_name: "Kumar",
    role: UserRole::Employee,
};

struct SampleExpense {
    amount: i64,
    category: ExpenseCategory,
    subcategory: &'static str,
    description: &'static str,
    day: u32,
    status: ExpenseStatus,
    tags: &'static [&'static str],
}

const SAMPLE_EXPENSES: &[SampleExpense] = &[
    SampleExpense {
        amount: 2500,
        category: ExpenseCategory::Food,
        subcategory: "Business Lunch",
        description: "Client meeting lunch at Taj Hotel, Mumbai",
        day: 1,
        status: ExpenseStatus::Pending,
        tags: &["client-meeting", "lunch", "mumbai"],
    },
    SampleExpense {
        amount: 3200,
        category: ExpenseCategory::Office,
        subcategory: "Supplies",
        description: "Office supplies and stationery from Reliance Digital",
        day: 2,
        status: ExpenseStatus::Approved,
        tags: &["office-supplies", "stationery"],
    },
    SampleExpense {
        amount: 1800,
        category: ExpenseCategory::Travel,
        subcategory: "Transportation",
        description: "Uber to Bangalore airport for client visit",
        day: 3,
        status: ExpenseStatus::Draft,
        tags: &["travel", "uber", "bangalore"],
    },
    SampleExpense {
        amount: 650,
        category: ExpenseCategory::Travel,
        subcategory: "Accommodation",
        description: "Tea and snacks during travel - Railway station",
        day: 4,
        status: ExpenseStatus::Pending,
        tags: &["travel", "food", "railway"],
    },
];

async fn new_user(
    hasher: &PasswordHasher,
    company_id: Uuid,
    demo: &DemoUser,
    manager_id: Option<Uuid>,
) -> anyhow::Result<NewUser> {
    Ok(NewUser {
        company_id,
        email: demo.email.to_string(),
        password_hash: hasher.hash(demo.password).await?,
        first_name: demo.first_name.to_string(),
        last_name: demo.last_name.to_string(),
        role: demo.role,
        manager_id,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    if User::find_by_email(&pool, ADMIN_EMAIL).await?.is_some() {
        println!("Demo tenant already present, nothing to do");
        return Ok(());
    }

    let hasher = PasswordHasher::new();
    let mut tx = pool.begin().await?;

    let company_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO companies (id, name, currency_code, country, settings)
        VALUES ($1, $2, 'INR', 'India', $3)
        "#,
    )
    .bind(company_id)
    .bind(COMPANY_NAME)
    .bind(serde_json::json!({
        "requireReceiptUpload": true,
        "autoApprovalThreshold": 5000,
        "allowMultiCurrency": true
    }))
    .execute(&mut *tx)
    .await?;
    println!("Created company {}", COMPANY_NAME);

    let admin = User::insert(&mut tx, new_user(&hasher, company_id, &ADMIN, None).await?).await?;
    let manager = User::insert(&mut tx, new_user(&hasher, company_id, &MANAGER, None).await?).await?;
    let employee = User::insert(
        &mut tx,
        new_user(&hasher, company_id, &EMPLOYEE, Some(manager.id)).await?,
    )
    .await?;
    println!("Created users {}, {} and {}", admin.email, manager.email, employee.email);

    let mut first_pending = None;
    for sample in SAMPLE_EXPENSES {
        let expense_id = Uuid::new_v4();
        let amount = Decimal::new(sample.amount, 0);
        let expense_date = NaiveDate::from_ymd_opt(2025, 10, sample.day)
            .ok_or_else(|| anyhow::anyhow!("invalid sample date"))?;
        let tags: Vec<String> = sample.tags.iter().map(|t| t.to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, company_id, employee_id, amount, original_currency, converted_amount,
                exchange_rate, category, subcategory, description, expense_date, tags, status
            )
            VALUES ($1, $2, $3, $4, 'INR', $4, 1, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(expense_id)
        .bind(company_id)
        .bind(employee.id)
        .bind(amount)
        .bind(sample.category.as_str())
        .bind(sample.subcategory)
        .bind(sample.description)
        .bind(expense_date)
        .bind(&tags)
        .bind(sample.status.as_str())
        .execute(&mut *tx)
        .await?;

        match sample.status {
            ExpenseStatus::Pending if first_pending.is_none() => {
                first_pending = Some((expense_id, amount));
            }
            ExpenseStatus::Approved => {
                sqlx::query(
                    r#"
                    INSERT INTO approval_steps (id, expense_id, approver_id, step_order, status, comments, decided_at)
                    VALUES ($1, $2, $3, 1, 'APPROVED', 'Within policy', NOW())
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(expense_id)
                .bind(manager.id)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }
    }
    println!("Created {} sample expenses", SAMPLE_EXPENSES.len());

    if let Some((expense_id, amount)) = first_pending {
        sqlx::query(
            r#"
            INSERT INTO approval_steps (id, expense_id, approver_id, step_order, status)
            VALUES ($1, $2, $3, 1, 'PENDING')
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(expense_id)
        .bind(manager.id)
        .execute(&mut *tx)
        .await?;

        NotificationService::create_in_tx(
            &mut tx,
            NewNotification {
                user_id: manager.id,
                company_id,
                kind: NotificationType::ApprovalRequired,
                title: "New Expense Requires Approval".to_string(),
                message: format!(
                    "{} submitted an expense for INR {} that requires your approval.",
                    employee.full_name(),
                    amount
                ),
                data: serde_json::json!({ "expense_id": expense_id, "amount": amount }),
            },
        )
        .await?;
        println!("Queued approval request for {}", manager.email);
    }

    tx.commit().await?;

    println!("\nDemo accounts for {}:", COMPANY_NAME);
    for demo in [&ADMIN, &MANAGER, &EMPLOYEE] {
        println!("  {:<9} {} / {}", demo.role.as_str(), demo.email, demo.password);
    }

    Ok(())
}

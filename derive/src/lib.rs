use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::{parse::Parser, parse_macro_input, Data, DataStruct, DeriveInput, Fields, Meta};

/// 生成 Record trait 的实现
///
/// 按字段声明顺序生成字段描述符，元数据在首次访问时构建并缓存
///
/// 使用示例：
/// ```ignore
/// #[derive(Default, Record)]
/// struct User {
///     #[sql(readonly)]
///     id: i64,
///     name: String,
///     age: Option<i32>,
///     #[sql(column = "created_at", unix)]
///     created: chrono::DateTime<chrono::Utc>,
///     #[sql(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// 字段属性 `#[sql(...)]`：
/// - `column = "..."`：列名，默认使用字段名
/// - `readonly`：不参与 INSERT / UPDATE
/// - `unix`：时间字段以 Unix 秒读写
/// - `skip`：不映射该字段
#[proc_macro_derive(Record, attributes(sql))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_record(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

/// 生成 Table trait 的实现
///
/// 使用示例：
/// ```ignore
/// #[derive(Record, Table)]
/// #[table(name = "users", id = "user_id")]
/// struct User {
///     user_id: i64,
///     name: String,
/// }
/// ```
///
/// 未指定 `name` 时使用结构体名称的 snake_case 形式，未指定 `id` 时使用 `"id"`
#[proc_macro_derive(Table, attributes(table))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_table(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

/// 字段上 `#[sql(...)]` 解析后的结果
#[derive(Debug, Default, PartialEq)]
struct FieldAttrs {
    column: Option<String>,
    readonly: bool,
    unix: bool,
    skip: bool,
}

fn expand_record(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let fields = named_fields(input, "Record")?;

    let mut seen = HashSet::new();
    let mut descriptors = Vec::new();
    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let field_str = ident.to_string();
        let column = attrs.column.unwrap_or_else(|| field_str.clone());
        if !seen.insert(column.clone()) {
            return Err(syn::Error::new_spanned(
                field,
                format!("column `{}` is mapped more than once", column),
            ));
        }

        let ty = &field.ty;
        let readonly = attrs.readonly;
        let unix = attrs.unix;
        descriptors.push(quote! {
            ::rowbind::FieldDescriptor {
                column: #column,
                field: #field_str,
                read_only: #readonly,
                unix: #unix,
                storage: <#ty as ::rowbind::SqlField>::STORAGE,
                get: |record: &#name| ::rowbind::SqlField::to_value(&record.#ident),
                set: |record: &mut #name, value: ::rowbind::Value| {
                    ::rowbind::SqlField::assign(&mut record.#ident, value)
                },
            }
        });
    }

    if descriptors.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Record derive requires at least one mapped field",
        ));
    }

    let type_name = name.to_string();
    Ok(quote! {
        impl ::rowbind::Record for #name {
            fn metadata() -> ::rowbind::Result<&'static ::rowbind::RecordMeta<Self>> {
                static META: ::rowbind::meta::MetaCell<#name> = ::std::sync::OnceLock::new();
                ::rowbind::meta::resolve(&META, #type_name, || {
                    ::std::vec![#(#descriptors),*]
                })
            }
        }
    })
}

fn expand_table(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    named_fields(input, "Table")?;

    let mut table_name = None;
    let mut id_column = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("table") {
            continue;
        }
        for meta in parse_attr_list(attr)? {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("name") => {
                    table_name = Some(lit_str(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("id") => {
                    id_column = Some(lit_str(&nv.value)?);
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unknown table attribute, expected `name` or `id`",
                    ));
                }
            }
        }
    }

    // 如果没有指定表名，使用结构体名称的小写蛇形命名方式
    let table = table_name.unwrap_or_else(|| to_snake_case(&name.to_string()));
    // 如果没有指定主键，默认使用 "id"
    let id = id_column.unwrap_or_else(|| "id".to_string());

    Ok(quote! {
        impl ::rowbind::Table for #name {
            const TABLE: &'static str = #table;
            const ID_COLUMN: &'static str = #id;
        }
    })
}

/// 只接受没有泛型参数、具名字段的结构体
fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            format!("{} derive does not support generic structs", derive),
        ));
    }
    match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => Ok(&fields.named),
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{} derive only supports structs with named fields", derive),
        )),
    }
}

fn parse_attr_list(attr: &syn::Attribute) -> syn::Result<Vec<Meta>> {
    match &attr.meta {
        Meta::List(list) => {
            let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
            Ok(parser.parse2(list.tokens.clone())?.into_iter().collect())
        }
        other => Err(syn::Error::new_spanned(
            other,
            "expected a list, e.g. `#[sql(column = \"name\")]`",
        )),
    }
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("sql") {
            continue;
        }
        for meta in parse_attr_list(attr)? {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("column") => {
                    parsed.column = Some(lit_str(&nv.value)?);
                }
                Meta::Path(path) if path.is_ident("readonly") => parsed.readonly = true,
                Meta::Path(path) if path.is_ident("unix") => parsed.unix = true,
                Meta::Path(path) if path.is_ident("skip") => parsed.skip = true,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unknown sql attribute, expected `column`, `readonly`, `unix` or `skip`",
                    ));
                }
            }
        }
    }
    if matches!(parsed.column.as_deref(), Some("")) {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "column name must not be empty",
        ));
    }
    Ok(parsed)
}

fn lit_str(expr: &syn::Expr) -> syn::Result<String> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Str(s),
        ..
    }) = expr
    {
        Ok(s.value())
    } else {
        Err(syn::Error::new_spanned(expr, "expected a string literal"))
    }
}

/// 将 PascalCase 转换为 snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            result.push('_');
        }
        result.push(c.to_ascii_lowercase());
    }
    result
}

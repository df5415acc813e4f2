/*!

This is the long-form manual for `survey_records` and `surveysheet`.

## Fields and keys

The schema is an ordered list of labels such as `Name of the Block`. Each label gets a
key that is used to store the data: the label is lower-cased, every run of characters
that are not letters or digits (ASCII) becomes one `_`, and the `_` at both ends are
removed. `Name of the Block` becomes `name_of_the_block`, `Contact No. (mobile)`
becomes `contact_no_mobile`.

Two labels that produce the same key, or a label that produces an empty key (`???`),
are rejected when the schema is built.

## Importing a spreadsheet

The first row of the sheet holds the headers. Every other row becomes one record. For
each field of the schema, the value is looked up in the row as follows, and the first
rule that finds something wins:

1. a header that is exactly the label (`Name of the Block`);
2. a header that is exactly the key (`name_of_the_block`);
3. a header that is the label once both are trimmed and lower-cased
   (`  NAME OF THE BLOCK`). When several headers qualify, the leftmost one is used.

A field that matches none of these is left empty. Columns that do not match any field
are ignored, and a row that matches nothing at all still produces an empty record:
nothing is rejected. The import summary lists how many values were found by each rule
and which headers were ignored.

Only the inside of the header is compared as-is: `Name  of the Block` (two spaces) does
not match `Name of the Block`.

A spreadsheet without any data row is reported as "no data found" and nothing is
added.

| Header in the file       | Field `Name of the Block` |
|--------------------------|---------------------------|
| `Name of the Block`      | rule 1                    |
| `name_of_the_block`      | rule 2                    |
| `NAME OF THE BLOCK  `    | rule 3                    |
| `Block name`             | not matched               |

## Exporting

The exported sheet has exactly one column per field, titled with the label, in schema
order. Exporting an empty collection is reported and no file is written.

## Storage

The collection is stored as a JSON array with one flat object per record, keyed by the
field keys:

```json
[{"age":"41","name_of_the_block":"Sojat"}]
```

Keys that are not in the schema are dropped when the data is loaded, and missing keys
read as empty. If the stored data cannot be read, the program starts with an empty
collection (and logs a warning).

## Configuration

`surveysheet --config FILE` reads a JSON file where every entry is optional:

```json
{
  "storageDirectory": "data",
  "namespace": "survey_records",
  "exportFileName": "survey_records.xlsx",
  "sheetName": "Survey",
  "excelWorksheetName": "Form1",
  "fields": ["Name of the Block", "Age"]
}
```

- `storageDirectory`: where `<namespace>.json` is kept (default: the current directory)
- `namespace`: the name of the dataset (default `survey_records`)
- `exportFileName`: the file written by `export` when no file is given
- `sheetName`: the name of the sheet in exported `.xlsx` files (default `Survey`)
- `excelWorksheetName`: the sheet to read when importing `.xlsx` files (default: the
  first one)
- `fields`: the labels of the schema (default: the built-in survey form)

*/
